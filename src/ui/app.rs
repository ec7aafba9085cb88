use std::{collections::HashMap, time::Duration};

use anyhow::{anyhow, bail, ensure, Context, Result};
use tracing::{debug, error, info, trace, warn};

use super::{
    overlay::DrawOp,
    ui_types::Step,
    wizard::{SideEffect, TrainingWizard, WizardEvent},
};
use crate::{
    account::{Credentials, SaveSlot, SessionContext},
    appconfig::AppSettings,
    server::{Endpoint, ServerCommand, ServerControl, ServerReply},
    transfer::build_upload_form,
    vision::{DetectionBridge, Detector, Nv21Frame, TaskMode},
};

#[derive(Debug, Clone, PartialEq)]
enum PendingRequest {
    Login(Credentials),
    Signup,
    Upload(SaveSlot),
    Download(SaveSlot),
}

/// Event loop state: owns the session, the wizard, the detection bridge and
/// the server client. Replies from worker threads arrive on `inbox`.
pub struct App<D> {
    pub settings: AppSettings,
    pub session: Option<SessionContext>,
    pub wizard: Option<TrainingWizard>,
    pub bridge: DetectionBridge<D>,
    /// Last downloaded detector file.
    pub detector_file: Option<Vec<u8>>,
    save_slot: Option<SaveSlot>,
    server: ServerControl,
    inbox: crossbeam_channel::Receiver<ServerReply>,
    pending: HashMap<u64, PendingRequest>,
    notices: Vec<String>,
}

impl<D: Detector> App<D> {
    pub fn new(settings: AppSettings, detector: D) -> Result<Self> {
        settings.validate()?;

        let (tx, inbox) = crossbeam_channel::unbounded();
        let server = ServerControl::new(&settings, tx)?;
        let bridge = DetectionBridge::new(
            detector,
            settings.camera_settings(),
            settings.display_size.landscape(),
        );

        Ok(App {
            settings,
            session: None,
            wizard: None,
            bridge,
            detector_file: None,
            save_slot: None,
            server,
            inbox,
            pending: HashMap::new(),
            notices: vec![],
        })
    }

    /// Messages for the operator, oldest first.
    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    pub fn is_busy(&self) -> bool {
        !self.pending.is_empty()
    }

    fn notify(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        info!("notice: {}", msg);
        self.notices.push(msg);
    }

    fn send(&mut self, command: ServerCommand, credentials: &Credentials, pending: PendingRequest) -> Result<u64> {
        let id = self.server.dispatch(command, credentials)?;
        self.pending.insert(id, pending);
        Ok(id)
    }

    fn session(&self) -> Result<&SessionContext> {
        self.session.as_ref().ok_or_else(|| anyhow!("Not logged in"))
    }
}

/// account
impl<D: Detector> App<D> {
    pub fn login(&mut self, user: &str, pass: &str) -> Result<u64> {
        let credentials = Credentials::new(user, pass);
        self.send(
            ServerCommand::Login,
            &credentials,
            PendingRequest::Login(credentials.clone()),
        )
    }

    pub fn signup(&mut self, user: &str, pass: &str, mail: &str) -> Result<u64> {
        let credentials = Credentials::new(user, pass);
        self.send(
            ServerCommand::Signup {
                mail: mail.to_string(),
            },
            &credentials,
            PendingRequest::Signup,
        )
    }

    pub fn logout(&mut self) {
        info!("logout");
        self.session = None;
        self.wizard = None;
        self.save_slot = None;
    }
}

/// training
impl<D: Detector> App<D> {
    /// Opens a new wizard. `slot_choice` is only used once every slot is taken.
    pub fn start_training(&mut self, slot_choice: Option<u8>) -> Result<()> {
        let slot = self.session()?.next_save_slot(slot_choice)?;
        info!("new training pass into slot {}", slot);

        self.save_slot = Some(slot);
        self.wizard = Some(TrainingWizard::new(self.settings.display_size.landscape()));
        self.bridge.set_mode(TaskMode::Training);
        Ok(())
    }

    /// Takes a still from the latest frame and hands it to the wizard.
    pub fn capture(&mut self) -> Result<(Step, Vec<SideEffect>)> {
        ensure!(self.wizard.is_some(), "No training in progress");
        let still = self
            .bridge
            .capture_still()
            .context("capture the image to bitmap failed")?;
        self.handle_event(WizardEvent::Capture(still))
    }

    /// Forwards an operator event to the wizard; a finished wizard is uploaded.
    pub fn handle_event(&mut self, event: WizardEvent) -> Result<(Step, Vec<SideEffect>)> {
        let wizard = self
            .wizard
            .as_mut()
            .ok_or_else(|| anyhow!("No training in progress"))?;

        let (step, effects) = wizard.handle(event);

        for effect in &effects {
            match effect {
                SideEffect::StopCamera => debug!("camera stopped"),
                SideEffect::Autofocus => trace!("autofocus"),
                SideEffect::Submit => {
                    self.submit_training()?;
                }
                _ => {}
            }
        }

        Ok((step, effects))
    }

    fn submit_training(&mut self) -> Result<u64> {
        info!("upload picture and training data");
        let slot = self
            .save_slot
            .ok_or_else(|| anyhow!("No save slot chosen"))?;
        let wizard = self
            .wizard
            .as_ref()
            .ok_or_else(|| anyhow!("No training in progress"))?;
        let still = wizard
            .still()
            .ok_or_else(|| anyhow!("No captured image to upload"))?;

        let fields = build_upload_form(still, wizard.history(), slot)?;
        let credentials = self.session()?.credentials.clone();

        self.send(
            ServerCommand::Upload { slot, fields },
            &credentials,
            PendingRequest::Upload(slot),
        )
    }
}

/// detection
impl<D: Detector> App<D> {
    /// Requests the detector file stored in `slot`.
    pub fn load_record(&mut self, slot: u8) -> Result<u64> {
        let session = self.session()?;
        let slot = SaveSlot::new(slot, session.max_slots)?;
        ensure!(session.has_slot(slot), "No training saved in slot {}", slot);
        let credentials = session.credentials.clone();

        self.send(
            ServerCommand::Download { slot },
            &credentials,
            PendingRequest::Download(slot),
        )
    }

    /// Latest camera frame. In detection mode this runs one pass unless one
    /// is already in flight, and returns the detection layer's paint ops.
    pub fn on_frame(&mut self, frame: Nv21Frame) -> Option<Vec<DrawOp>> {
        if self.bridge.on_frame(frame) {
            self.bridge.run_pass()
        } else {
            None
        }
    }
}

/// replies
impl<D: Detector> App<D> {
    /// Applies every reply that has arrived. Returns how many were handled.
    pub fn poll(&mut self) -> usize {
        let replies: Vec<ServerReply> = self.inbox.try_iter().collect();
        let n = replies.len();
        for reply in replies {
            self.handle_reply(reply);
        }
        n
    }

    /// Blocks until one reply arrives, then applies it.
    pub fn wait_reply(&mut self, timeout: Duration) -> Result<()> {
        let reply = self
            .inbox
            .recv_timeout(timeout)
            .context("No reply from server")?;
        self.handle_reply(reply);
        Ok(())
    }

    pub(crate) fn handle_reply(&mut self, reply: ServerReply) {
        let Some(pending) = self.pending.remove(&reply.id) else {
            warn!("unexpected reply {} from {:?}", reply.id, reply.endpoint);
            return;
        };
        debug!("reply {} from {}", reply.id, reply.endpoint.path());

        let body = match reply.body {
            Ok(body) => body,
            Err(status) => {
                if let PendingRequest::Upload(_) = pending {
                    self.wizard = None;
                }
                self.notify(status);
                return;
            }
        };

        match pending {
            PendingRequest::Login(credentials) => {
                match SessionContext::from_login_response(
                    credentials,
                    &body,
                    self.settings.max_save_slots,
                ) {
                    Ok(session) => {
                        info!("logged in as {}, saves = {}", session.credentials.user, session.saves);
                        self.session = Some(session);
                        self.notify("logged : true");
                    }
                    Err(e) => self.notify(e.to_string()),
                }
            }
            PendingRequest::Signup => {
                self.notify(String::from_utf8_lossy(&body));
            }
            PendingRequest::Upload(slot) => {
                let msg = match self.session.as_mut() {
                    Some(session) => session.record_upload(slot, &body),
                    None => String::from_utf8_lossy(&body).into_owned(),
                };
                self.wizard = None;
                self.save_slot = None;
                self.notify(msg);
            }
            PendingRequest::Download(slot) => {
                info!("downloaded slot {}: {} bytes", slot, body.len());
                self.notify("Finish Download");
                if self.bridge.init_detector(&body) {
                    self.bridge.set_mode(TaskMode::Detection);
                } else {
                    self.notify("Detector init failed");
                }
                self.detector_file = Some(body);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ui::ui_types::{Layer, Point, Size},
        vision::NullDetector,
    };

    /// Accepts files starting with `DK` and reports one box.
    struct StubDetector;

    impl Detector for StubDetector {
        fn init(&mut self, detector_file: &[u8]) -> bool {
            detector_file.starts_with(b"DK")
        }

        fn detect(&mut self, _width: u32, _height: u32, _frame: &[u8], result: &mut [i32]) {
            result[..6].copy_from_slice(&[1, 7, 100, 100, 50, 50]);
        }
    }

    fn app<D: Detector>(detector: D) -> App<D> {
        let settings = AppSettings {
            server_url: "http://127.0.0.1:9".to_string(),
            display_size: Size::new(1280, 720),
            ..Default::default()
        };
        App::new(settings, detector).unwrap()
    }

    fn logged_in<D: Detector>(detector: D, reply: &[u8]) -> App<D> {
        let mut app = app(detector);
        let id = app.login("op", "pw").unwrap();
        app.handle_reply(ServerReply {
            id,
            endpoint: Endpoint::Login,
            body: Ok(reply.to_vec()),
        });
        app
    }

    fn frame(width: u32, height: u32) -> Nv21Frame {
        Nv21Frame {
            width,
            height,
            data: vec![128; Nv21Frame::expected_len(width, height)],
        }
    }

    fn pending_id(app: &App<impl Detector>, want: fn(&PendingRequest) -> bool) -> u64 {
        *app.pending
            .iter()
            .find(|(_, p)| want(p))
            .map(|(id, _)| id)
            .unwrap()
    }

    #[test]
    fn test_login_creates_session() {
        let mut app = logged_in(NullDetector, b"2login success!");
        let session = app.session.as_ref().unwrap();
        assert_eq!(session.saves, 2);
        assert_eq!(session.credentials, Credentials::new("op", "pw"));
        assert_eq!(app.take_notices(), vec!["logged : true".to_string()]);

        app.logout();
        assert!(app.session.is_none());
    }

    #[test]
    fn test_login_failure_keeps_logged_out() {
        let mut app = logged_in(NullDetector, b"no such user");
        assert!(app.session.is_none());
        assert_eq!(app.take_notices(), vec!["login failed \nno such user".to_string()]);
        assert!(app.start_training(None).is_err());
    }

    #[test]
    fn test_network_error_is_surfaced() {
        let mut app = app(NullDetector);
        let id = app.signup("op", "pw", "op@example.com").unwrap();
        app.handle_reply(ServerReply {
            id,
            endpoint: Endpoint::Signup,
            body: Err("Server returned 500 Internal Server Error".to_string()),
        });
        assert_eq!(
            app.take_notices(),
            vec!["Server returned 500 Internal Server Error".to_string()]
        );
        assert!(!app.is_busy());
    }

    #[test]
    fn test_wait_reply_applies_worker_reply() {
        /// nothing listens on the discard port
        let mut app = app(NullDetector);
        app.login("op", "pw").unwrap();
        assert!(app.is_busy());

        app.wait_reply(Duration::from_secs(30)).unwrap();
        assert!(!app.is_busy());
        assert!(app.session.is_none());

        let notices = app.take_notices();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].starts_with("Failed to send request"), "{}", notices[0]);

        assert_eq!(app.poll(), 0);
        assert!(app.take_notices().is_empty());
    }

    #[test]
    fn test_unknown_reply_ignored() {
        let mut app = app(NullDetector);
        app.handle_reply(ServerReply {
            id: 999,
            endpoint: Endpoint::Upload,
            body: Ok(b"Upload Success!".to_vec()),
        });
        assert!(app.take_notices().is_empty());
    }

    #[test]
    fn test_training_pass_uploads() {
        let mut app = logged_in(NullDetector, b"2login success!");
        app.take_notices();
        app.start_training(None).unwrap();

        assert!(app.capture().is_err());
        assert_eq!(app.on_frame(frame(64, 48)), None);
        let (step, effects) = app.capture().unwrap();
        assert_eq!(step, Step::Begin);
        assert_eq!(effects, vec![SideEffect::ShowStill]);

        app.handle_event(WizardEvent::Confirm).unwrap();
        for (from, to) in [((100, 100), (600, 400)), ((120, 120), (300, 200))] {
            app.handle_event(WizardEvent::Press(Point::from(from))).unwrap();
            app.handle_event(WizardEvent::Release(Point::from(to))).unwrap();
            app.handle_event(WizardEvent::Confirm).unwrap();
        }
        app.handle_event(WizardEvent::Press(Point::new(200, 150))).unwrap();
        app.handle_event(WizardEvent::Release(Point::new(250, 180))).unwrap();
        let (step, effects) = app.handle_event(WizardEvent::Finish).unwrap();
        assert_eq!(step, Step::Done);
        assert!(effects.iter().any(|e| matches!(
            e,
            SideEffect::Paint {
                layer: Layer::History,
                ..
            }
        )));
        assert!(app.is_busy());

        let id = pending_id(&app, |p| matches!(p, PendingRequest::Upload(_)));
        app.handle_reply(ServerReply {
            id,
            endpoint: Endpoint::Upload,
            body: Ok(b"training started\nUpload Success!".to_vec()),
        });

        assert_eq!(app.take_notices(), vec!["Saving to #3".to_string()]);
        assert_eq!(app.session.as_ref().unwrap().saves, 3);
        assert!(app.wizard.is_none());
    }

    #[test]
    fn test_download_enables_detection() {
        let mut app = logged_in(StubDetector, b"1login success!");
        app.take_notices();

        assert!(app.load_record(2).is_err());
        assert!(app.load_record(0).is_err());
        let id = app.load_record(1).unwrap();

        app.handle_reply(ServerReply {
            id,
            endpoint: Endpoint::Download,
            body: Ok(b"DK001".to_vec()),
        });
        assert_eq!(app.take_notices(), vec!["Finish Download".to_string()]);
        assert_eq!(app.bridge.mode(), TaskMode::Detection);
        assert_eq!(app.detector_file.as_deref(), Some(&b"DK001"[..]));

        let ops = app.on_frame(frame(640, 480)).unwrap();
        assert_eq!(ops.len(), 2);
    }

    #[test]
    fn test_rejected_detector_file() {
        let mut app = logged_in(StubDetector, b"1login success!");
        app.take_notices();
        let id = app.load_record(1).unwrap();
        app.handle_reply(ServerReply {
            id,
            endpoint: Endpoint::Download,
            body: Ok(b"<html>error</html>".to_vec()),
        });
        assert_eq!(
            app.take_notices(),
            vec!["Finish Download".to_string(), "Detector init failed".to_string()]
        );
        assert_eq!(app.bridge.mode(), TaskMode::Training);
        assert_eq!(app.on_frame(frame(640, 480)), None);
    }
}
