/*
Copyright 2017 Takashi Ogura

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

const DEFAULT_CAPACITY: usize = 64;

/// Elements sorted by increasing key
///
/// Backed by a sorted `Vec`, elements with equal keys keep their insertion
/// order.
pub struct OrderedIndex<T, F>
where
    F: Fn(&T) -> f64,
{
    elements: Vec<T>,
    key: F,
    capacity: usize,
}

impl<T, F> OrderedIndex<T, F>
where
    F: Fn(&T) -> f64,
{
    pub fn new(key: F) -> Self {
        Self::with_capacity(DEFAULT_CAPACITY, key)
    }

    /// Index reserving room for `capacity` elements on every reset
    pub fn with_capacity(capacity: usize, key: F) -> Self {
        let mut index = OrderedIndex {
            elements: Vec::new(),
            key,
            capacity,
        };
        index.reset();
        index
    }

    /// Insert after all elements whose key is not greater
    pub fn add(&mut self, element: T) -> usize {
        let value = (self.key)(&element);
        let position = self.elements.partition_point(|e| (self.key)(e) <= value);
        self.elements.insert(position, element);
        position
    }

    /// Index of an element with exactly `key`, or the position where such an
    /// element would be inserted
    pub fn get(&self, key: f64) -> usize {
        self.elements.partition_point(|e| (self.key)(e) < key)
    }

    pub fn reset(&mut self) {
        self.elements.clear();
        self.elements.reserve(self.capacity);
    }

    pub fn element(&self, index: usize) -> Option<&T> {
        self.elements.get(index)
    }

    pub fn remove(&mut self, index: usize) -> T {
        self.elements.remove(index)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Number of elements the index holds without reallocating
    pub fn capacity(&self) -> usize {
        self.elements.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.elements.iter()
    }
}
