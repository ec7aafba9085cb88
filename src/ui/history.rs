use super::ui_types::{Region, RegionKind};

/// Committed regions in wizard order. Entry 0 is the ROI.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, Default, PartialEq)]
pub struct History {
    regions: Vec<Region>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalizes the region's image-space corners and appends it.
    pub fn append(&mut self, region: Region) {
        self.regions.push(region.normalized());
    }

    /// Ordered view from index 0. Does not consume or mutate the history.
    pub fn replay(&self) -> std::slice::Iter<'_, Region> {
        self.regions.iter()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn roi(&self) -> Option<&Region> {
        self.regions.first().filter(|r| r.kind == RegionKind::Roi)
    }

    /// Everything after the ROI.
    pub fn tags(&self) -> &[Region] {
        self.regions.get(1..).unwrap_or(&[])
    }
}
