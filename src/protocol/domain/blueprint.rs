//! Blueprint documents and the overlays that reference them.

use super::{BlueprintId, Marker, NormalizedPoint, NormalizedRect, PageNumber, TaskNumber, TaskStatus};

/// A status-colored rectangle overlay on one blueprint page.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Owning task number, shown in the badge.
    pub task_number: TaskNumber,
    /// Owning task status; selects the overlay colors.
    pub task_status: TaskStatus,
    /// Normalized rectangle.
    pub rect: NormalizedRect,
    /// Target page, 1-indexed.
    pub page: PageNumber,
}

/// The ordered point markers one task places on a blueprint.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerGroup {
    /// Owning task number, used as the label prefix.
    pub task_number: TaskNumber,
    /// Markers in placement order.
    pub markers: Vec<Marker>,
}

/// A marker resolved for drawing on a particular page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedMarker {
    /// Owning task number.
    pub task_number: TaskNumber,
    /// 1-indexed position within the owning group.
    pub ordinal: usize,
    /// Normalized position.
    pub point: NormalizedPoint,
}

impl PlacedMarker {
    /// Label drawn inside the marker circle, `"{task}-{ordinal}"`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}-{}", self.task_number, self.ordinal)
    }
}

/// A blueprint with its source bytes and the overlays belonging to it.
#[derive(Debug, Clone, PartialEq)]
pub struct BlueprintDocument {
    /// Blueprint identifier.
    pub id: BlueprintId,
    /// Display name.
    pub name: String,
    /// Raw source document; may hold several pages.
    pub source: Vec<u8>,
    /// Rectangle overlays.
    pub annotations: Vec<Annotation>,
    /// Point marker groups.
    pub marker_groups: Vec<MarkerGroup>,
}

impl BlueprintDocument {
    /// Creates a blueprint without overlays.
    #[must_use]
    pub fn new(id: BlueprintId, name: impl Into<String>, source: Vec<u8>) -> Self {
        Self {
            id,
            name: name.into(),
            source,
            annotations: Vec::new(),
            marker_groups: Vec::new(),
        }
    }

    /// Annotations targeting `page`.
    pub fn annotations_on(&self, page: PageNumber) -> impl Iterator<Item = &Annotation> + '_ {
        self.annotations
            .iter()
            .filter(move |annotation| annotation.page == page)
    }

    /// Markers targeting `page`, each tagged with its position in its group.
    ///
    /// The ordinal counts every marker of the group, including those on
    /// other pages, so labels stay stable across pages.
    pub fn markers_on(&self, page: PageNumber) -> impl Iterator<Item = PlacedMarker> + '_ {
        self.marker_groups.iter().flat_map(move |group| {
            group
                .markers
                .iter()
                .enumerate()
                .filter(move |(_, marker)| marker.page == page)
                .map(move |(index, marker)| PlacedMarker {
                    task_number: group.task_number,
                    ordinal: index + 1,
                    point: marker.point,
                })
        })
    }

    /// Number of overlays whose page lies beyond `page_count`.
    #[must_use]
    pub fn overlays_beyond(&self, page_count: u32) -> usize {
        let rects = self
            .annotations
            .iter()
            .filter(|annotation| annotation.page.get() > page_count)
            .count();
        let markers = self
            .marker_groups
            .iter()
            .flat_map(|group| group.markers.iter())
            .filter(|marker| marker.page.get() > page_count)
            .count();
        rects + markers
    }
}
