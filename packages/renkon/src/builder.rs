//! Accumulating list builders for declarative registration.
//!
//! Endpoints, action types, and scenarios are assembled from blocks of
//! single elements, optional elements, sequences, and conditional branches;
//! all of those fold into a flat list through one builder shape.

/// A value that accumulates elements and folds into a `Vec`.
pub struct ListBuilder<T> {
    items: Vec<T>,
}

impl<T> ListBuilder<T> {
    /// An empty builder.
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Appends one element.
    pub fn add(mut self, item: T) -> Self {
        self.items.push(item);
        self
    }

    /// Appends an element if it is present.
    pub fn add_opt(mut self, item: Option<T>) -> Self {
        if let Some(item) = item {
            self.items.push(item);
        }
        self
    }

    /// Appends a sequence of elements.
    pub fn add_all(mut self, items: impl IntoIterator<Item = T>) -> Self {
        self.items.extend(items);
        self
    }

    /// Appends an element when `condition` holds.
    pub fn add_if(self, condition: bool, item: impl FnOnce() -> T) -> Self {
        if condition {
            self.add(item())
        } else {
            self
        }
    }

    /// Folds into the accumulated list.
    pub fn build(self) -> Vec<T> {
        self.items
    }
}

impl<T> Default for ListBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<T> for ListBuilder<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_shapes_fold_into_a_flat_list() {
        let built = ListBuilder::new()
            .add(1)
            .add_opt(Some(2))
            .add_opt(None)
            .add_all([3, 4])
            .add_if(true, || 5)
            .add_if(false, || 6)
            .build();
        assert_eq!(built, vec![1, 2, 3, 4, 5]);
    }
}
