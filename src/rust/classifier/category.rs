use serde::Serialize;

/// A single `(label, score)` pair produced by classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    label: String,
    score: f32,
}

impl Category {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn score(&self) -> f32 {
        self.score
    }
}

/// Categories in the order of the model's output layer.
///
/// The order is not sorted by score, and the length always equals the
/// number of labels the model was trained with.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ClassificationResult {
    categories: Vec<Category>,
}

impl ClassificationResult {
    pub(crate) fn new(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Category> {
        self.categories.iter()
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Returns the category with the given label, if the model has one
    pub fn get(&self, label: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.label == label)
    }

    /// Returns the highest scoring category
    pub fn top(&self) -> Option<&Category> {
        self.categories
            .iter()
            .max_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal))
    }
}

impl IntoIterator for ClassificationResult {
    type Item = Category;
    type IntoIter = std::vec::IntoIter<Category>;

    fn into_iter(self) -> Self::IntoIter {
        self.categories.into_iter()
    }
}

impl<'a> IntoIterator for &'a ClassificationResult {
    type Item = &'a Category;
    type IntoIter = std::slice::Iter<'a, Category>;

    fn into_iter(self) -> Self::IntoIter {
        self.categories.iter()
    }
}
