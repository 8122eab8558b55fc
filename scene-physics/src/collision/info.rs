// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Contact records produced by swept collision tests

use crate::scene::ObjectId;
use glam::Vec2;

/// A single contact between the moving object and something it hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionInfo {
    /// Time of impact within the tested interval, 0 when already overlapping
    pub time: f32,
    /// World-space contact point
    pub position: Vec2,
    /// Unit surface normal pointing from the other surface toward us
    pub normal: Vec2,
    /// Minimum translation that separates us, zero unless overlapping
    pub penetration: Vec2,
    /// Object hit, `None` for a world limit boundary
    pub other: Option<ObjectId>,
    /// Index of our collision image, which also selects our material
    pub our_image: usize,
    /// Index of the other object's collision image
    pub their_image: Option<usize>,
}

impl CollisionInfo {
    /// Contact with no object or image attribution yet
    pub fn new(time: f32, position: Vec2, normal: Vec2, penetration: Vec2) -> Self {
        CollisionInfo {
            time,
            position,
            normal,
            penetration,
            other: None,
            our_image: 0,
            their_image: None,
        }
    }

    /// The same contact seen from the other object
    ///
    /// `us` becomes the other object; normal and penetration flip and the
    /// image indices swap.
    pub fn mirrored(&self, us: ObjectId) -> CollisionInfo {
        CollisionInfo {
            time: self.time,
            position: self.position,
            normal: -self.normal,
            penetration: -self.penetration,
            other: Some(us),
            our_image: self.their_image.unwrap_or(0),
            their_image: Some(self.our_image),
        }
    }

    /// True if the objects were already overlapping at the start of the test
    pub fn is_overlap(&self) -> bool {
        self.penetration != Vec2::ZERO
    }
}

/// Attribution stamped onto contacts offered to a [`ContactList`]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContactStamp {
    /// Object being tested against
    pub other: Option<ObjectId>,
    /// Our image index
    pub our_image: usize,
    /// Their image index
    pub their_image: Option<usize>,
    /// The test ran from the other image's side and must be flipped back
    pub mirrored: bool,
    /// Velocity of our frame relative to the frame the test ran in
    ///
    /// Contact positions are moved by `drift * time` so every contact is
    /// reported with the other object held at its start pose.
    pub drift: Vec2,
}

/// Earliest contacts found so far during one swept query
///
/// Contacts within `epsilon` of each other in time are kept together as a
/// multi-point contact; a contact more than `epsilon` earlier replaces the
/// whole list.
#[derive(Debug, Clone)]
pub struct ContactList {
    contacts: Vec<CollisionInfo>,
    epsilon: f32,
    stamp: ContactStamp,
}

impl ContactList {
    /// Create an empty list with the given simultaneity window
    pub fn new(epsilon: f32) -> Self {
        ContactList {
            contacts: Vec::new(),
            epsilon,
            stamp: ContactStamp::default(),
        }
    }

    /// Simultaneity window
    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    /// Set the attribution applied to subsequently offered contacts
    pub fn set_stamp(&mut self, stamp: ContactStamp) {
        self.stamp = stamp;
    }

    /// Offer a contact found within the budget `dt`
    ///
    /// A contact is accepted if `time < dt + epsilon`. One more than
    /// `epsilon` earlier than `dt` discards the collected contacts; `dt` is
    /// lowered to the earliest accepted time.
    ///
    /// # Returns
    ///
    /// `true` if the contact was kept
    pub fn offer(&mut self, dt: &mut f32, info: CollisionInfo) -> bool {
        if !(info.time < *dt + self.epsilon) {
            return false;
        }

        let mut info = info;
        if self.stamp.mirrored {
            info.normal = -info.normal;
            info.penetration = -info.penetration;
        }
        info.position += self.stamp.drift * info.time;
        info.other = self.stamp.other;
        info.our_image = self.stamp.our_image;
        info.their_image = self.stamp.their_image;

        if info.time < *dt - self.epsilon {
            self.contacts.clear();
        }
        if info.time < *dt {
            *dt = info.time;
        }
        self.contacts.push(info);
        true
    }

    /// Drop every contact
    pub fn clear(&mut self) {
        self.contacts.clear();
        self.stamp = ContactStamp::default();
    }

    /// Number of contacts
    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    /// True if no contact was accepted
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Contacts in the order they were found
    pub fn as_slice(&self) -> &[CollisionInfo] {
        &self.contacts
    }

    /// Earliest contact time
    pub fn earliest(&self) -> Option<f32> {
        self.contacts.iter().map(|c| c.time).reduce(f32::min)
    }
}
