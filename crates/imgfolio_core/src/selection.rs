/// Ordered set of selected image URLs.
///
/// Insertion order decides the page order of the generated PDF and the
/// numbering shown next to each selected image. Membership is plain string
/// equality.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selection {
    urls: Vec<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes `url` if it is selected, otherwise appends it.
    /// Returns `true` when the url is selected afterwards.
    pub fn toggle(&mut self, url: &str) -> bool {
        if let Some(pos) = self.position(url) {
            self.urls.remove(pos);
            false
        } else {
            self.urls.push(url.to_string());
            true
        }
    }

    /// Appends `url` unless it is already selected.
    pub fn insert(&mut self, url: &str) -> bool {
        if self.contains(url) {
            return false;
        }
        self.urls.push(url.to_string());
        true
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.iter().any(|u| u == url)
    }

    /// 1-based position of `url` in selection order.
    pub fn number_of(&self, url: &str) -> Option<usize> {
        self.position(url).map(|i| i + 1)
    }

    pub fn clear(&mut self) {
        self.urls.clear();
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.urls
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.urls.clone()
    }

    fn position(&self, url: &str) -> Option<usize> {
        self.urls.iter().position(|u| u == url)
    }
}
