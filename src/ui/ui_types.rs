#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// Width and height in pixels.
#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Landscape orientation: the larger dimension is the width.
    pub fn landscape(self) -> Self {
        if self.width >= self.height {
            self
        } else {
            Self::new(self.height, self.width)
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegionKind {
    Roi,
    Banner,
    Target,
}

impl RegionKind {
    pub fn to_str(&self) -> &str {
        match self {
            RegionKind::Roi => "ROI",
            RegionKind::Banner => "BANNER",
            RegionKind::Target => "TARGET",
        }
    }
}

/// A committed annotation rectangle, carried in both display and image space.
#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub kind: RegionKind,
    pub display_start: Point,
    pub display_end: Point,
    pub image_start: Point,
    pub image_end: Point,
}

impl Region {
    /// Swaps start/end per axis in image space so that start <= end.
    /// Display-space corners are kept as drawn.
    pub fn normalized(mut self) -> Self {
        if self.image_start.x > self.image_end.x {
            std::mem::swap(&mut self.image_start.x, &mut self.image_end.x);
        }
        if self.image_start.y > self.image_end.y {
            std::mem::swap(&mut self.image_start.y, &mut self.image_end.y);
        }
        self
    }

    /// (x, y, width, height) in image space. Only meaningful after normalizing.
    pub fn image_bounds(&self) -> (i32, i32, i32, i32) {
        (
            self.image_start.x,
            self.image_start.y,
            self.image_end.x - self.image_start.x,
            self.image_end.y - self.image_start.y,
        )
    }
}

/// Wizard cursor.
#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Begin,
    Roi,
    Banner,
    /// Repeats for as many targets as the operator tags.
    Target,
    /// History has been handed off for upload.
    Done,
}

impl Default for Step {
    fn default() -> Self {
        Step::Begin
    }
}

impl Step {
    pub fn region_kind(&self) -> Option<RegionKind> {
        match self {
            Step::Roi => Some(RegionKind::Roi),
            Step::Banner => Some(RegionKind::Banner),
            Step::Target => Some(RegionKind::Target),
            Step::Begin | Step::Done => None,
        }
    }

    pub fn is_annotating(&self) -> bool {
        self.region_kind().is_some()
    }

    pub fn next(&self) -> Step {
        match self {
            Step::Begin => Step::Roi,
            Step::Roi => Step::Banner,
            Step::Banner | Step::Target => Step::Target,
            Step::Done => Step::Done,
        }
    }
}

/// Which of the four wizard controls are available.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Affordances {
    pub capture: bool,
    pub confirm: bool,
    pub reset: bool,
    pub finish: bool,
}

impl Affordances {
    pub const NONE: Affordances = Affordances {
        capture: false,
        confirm: false,
        reset: false,
        finish: false,
    };

    pub const CAPTURE: Affordances = Affordances {
        capture: true,
        ..Self::NONE
    };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layer {
    /// The captured still, scaled to the display.
    Still,
    /// Committed regions, replayed from history.
    History,
    /// The rectangle currently being dragged.
    Drag,
    /// Live detection boxes.
    Detection,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Color {
    White,
    Red,
    Yellow,
}

impl Color {
    pub fn rgba(&self) -> [u8; 4] {
        match self {
            Color::White => [255, 255, 255, 255],
            Color::Red => [255, 0, 0, 255],
            Color::Yellow => [255, 255, 0, 255],
        }
    }
}
