use anyhow::{anyhow, bail, ensure, Context, Result};
use tracing::{debug, error, info, trace, warn};

use image::RgbImage;

use super::{
    history::History,
    overlay::{region_ops, DrawOp},
    projector::Projector,
    ui_types::{Affordances, Layer, Point, Region, RegionKind, Size, Step},
};

#[derive(Debug, Clone)]
pub enum WizardEvent {
    /// A still taken from the live camera.
    Capture(RgbImage),
    Confirm,
    Reset,
    Finish,
    Press(Point),
    Move(Point),
    Release(Point),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SideEffect {
    /// Freeze the capture session; the still becomes the annotation background.
    StopCamera,
    Autofocus,
    /// The scaled display copy of the still is ready to show.
    ShowStill,
    Paint { layer: Layer, ops: Vec<DrawOp> },
    /// History is final; encode and upload it.
    Submit,
}

/// The rectangle being dragged. Start is fixed on press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Drag {
    start: Point,
    image_start: Point,
    /// (display, image)
    end: Option<(Point, Point)>,
}

/// Capture/annotation wizard: BEGIN -> ROI -> BANNER -> TARGET... -> done.
///
/// Events for controls that are not currently available are ignored, as are
/// touches that fall outside the view.
#[derive(Debug, Clone)]
pub struct TrainingWizard {
    step: Step,
    view: Size,
    affordances: Affordances,
    still: Option<RgbImage>,
    display_still: Option<RgbImage>,
    drag: Option<Drag>,
    history: History,
}

impl TrainingWizard {
    pub fn new(view: Size) -> Self {
        Self {
            step: Step::Begin,
            view,
            affordances: Affordances::CAPTURE,
            still: None,
            display_still: None,
            drag: None,
            history: History::new(),
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn affordances(&self) -> Affordances {
        self.affordances
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// The still at capture resolution.
    pub fn still(&self) -> Option<&RgbImage> {
        self.still.as_ref()
    }

    /// The still scaled to the view.
    pub fn display_still(&self) -> Option<&RgbImage> {
        self.display_still.as_ref()
    }

    pub fn handle(&mut self, event: WizardEvent) -> (Step, Vec<SideEffect>) {
        let effects = match event {
            WizardEvent::Capture(img) => self.on_capture(img),
            WizardEvent::Confirm => self.on_confirm(),
            WizardEvent::Reset => self.on_reset(),
            WizardEvent::Finish => self.on_finish(),
            WizardEvent::Press(p) => self.on_press(p),
            WizardEvent::Move(p) => self.on_drag(p, false),
            WizardEvent::Release(p) => self.on_drag(p, true),
        };
        (self.step, effects)
    }

    fn projector(&self) -> Option<Projector> {
        let still = self.still.as_ref()?;
        Some(Projector::new(
            self.view,
            Size::new(still.width(), still.height()),
        ))
    }

    fn on_capture(&mut self, img: RgbImage) -> Vec<SideEffect> {
        if self.step != Step::Begin || !self.affordances.capture {
            return vec![];
        }
        if img.width() == 0 || img.height() == 0 {
            warn!("capture produced an empty image");
            return vec![];
        }

        let display_img = if img.width() != self.view.width || img.height() != self.view.height {
            image::imageops::resize(
                &img,
                self.view.width,
                self.view.height,
                image::imageops::FilterType::Nearest,
            )
        } else {
            img.clone()
        };
        debug!(
            "captured still {}x{}, display {}x{}",
            img.width(),
            img.height(),
            display_img.width(),
            display_img.height()
        );

        self.still = Some(img);
        self.display_still = Some(display_img);
        self.affordances = Affordances {
            confirm: true,
            reset: true,
            ..Affordances::NONE
        };

        vec![SideEffect::ShowStill]
    }

    fn on_confirm(&mut self) -> Vec<SideEffect> {
        if !self.affordances.confirm {
            return vec![];
        }

        match self.step {
            Step::Begin => {
                info!("capture confirmed");
                self.step = Step::Roi;
                self.affordances = Affordances::NONE;
                vec![SideEffect::StopCamera]
            }
            Step::Roi | Step::Banner | Step::Target => {
                let Some(kind) = self.step.region_kind() else {
                    return vec![];
                };
                if !self.commit_drag(kind) {
                    return vec![];
                }
                info!("{} committed, {} regions", kind.to_str(), self.history.len());
                self.step = self.step.next();
                self.affordances = Affordances::NONE;
                self.repaint_history()
            }
            Step::Done => vec![],
        }
    }

    fn on_reset(&mut self) -> Vec<SideEffect> {
        if !self.affordances.reset {
            return vec![];
        }

        match self.step {
            Step::Begin => {
                debug!("discarding still");
                self.still = None;
                self.display_still = None;
                self.affordances = Affordances::CAPTURE;
                vec![SideEffect::Paint {
                    layer: Layer::Still,
                    ops: vec![DrawOp::Clear],
                }]
            }
            Step::Roi | Step::Banner | Step::Target => {
                // only the in-progress rectangle, committed regions stay
                self.drag = None;
                self.affordances = Affordances::NONE;
                vec![SideEffect::Paint {
                    layer: Layer::Drag,
                    ops: vec![DrawOp::Clear],
                }]
            }
            Step::Done => vec![],
        }
    }

    fn on_finish(&mut self) -> Vec<SideEffect> {
        if !self.affordances.finish {
            return vec![];
        }

        self.commit_drag(RegionKind::Target);
        info!("annotation finished with {} regions", self.history.len());

        self.step = Step::Done;
        self.affordances = Affordances::NONE;

        let mut effects = self.repaint_history();
        effects.push(SideEffect::Submit);
        effects
    }

    fn on_press(&mut self, p: Point) -> Vec<SideEffect> {
        if !self.step.is_annotating() {
            return if self.step == Step::Begin {
                vec![SideEffect::Autofocus]
            } else {
                vec![]
            };
        }

        let Some(image_start) = self.projector().and_then(|proj| proj.project(p)) else {
            trace!("press outside view: {:?}", p);
            return vec![];
        };

        self.drag = Some(Drag {
            start: p,
            image_start,
            end: None,
        });
        self.affordances = Affordances::NONE;

        vec![]
    }

    fn on_drag(&mut self, p: Point, released: bool) -> Vec<SideEffect> {
        let Some(kind) = self.step.region_kind() else {
            return vec![];
        };
        let Some(image_p) = self.projector().and_then(|proj| proj.project(p)) else {
            trace!("drag outside view: {:?}", p);
            return vec![];
        };
        let Some(drag) = self.drag.as_mut() else {
            return vec![];
        };

        drag.end = Some((p, image_p));
        let start = drag.start;

        if released {
            self.affordances = Affordances {
                confirm: true,
                reset: true,
                finish: matches!(self.step, Step::Banner | Step::Target),
                ..Affordances::NONE
            };
        }

        let mut ops = vec![DrawOp::Clear];
        ops.extend(region_ops(kind, start, p));
        vec![SideEffect::Paint {
            layer: Layer::Drag,
            ops,
        }]
    }

    /// Appends the dragged rectangle, if it has an end point.
    fn commit_drag(&mut self, kind: RegionKind) -> bool {
        let Some(Drag {
            start,
            image_start,
            end: Some((end, image_end)),
        }) = self.drag.take()
        else {
            return false;
        };

        self.history.append(Region {
            kind,
            display_start: start,
            display_end: end,
            image_start,
            image_end,
        });
        true
    }

    fn repaint_history(&self) -> Vec<SideEffect> {
        let mut ops = vec![DrawOp::Clear];
        for r in self.history.replay() {
            ops.extend(region_ops(r.kind, r.display_start, r.display_end));
        }
        vec![
            SideEffect::Paint {
                layer: Layer::History,
                ops,
            },
            SideEffect::Paint {
                layer: Layer::Drag,
                ops: vec![DrawOp::Clear],
            },
        ]
    }
}
