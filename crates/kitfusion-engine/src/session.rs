use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use kitfusion_contracts::errors::{CaptureFailure, GenerationFailure};
use kitfusion_contracts::events::{SessionEvent, SessionLog};
use kitfusion_contracts::media::ImagePayload;
use kitfusion_contracts::presets::{
    find_filter, find_scene, find_shot, FilterPreset, PromptPreset, DEFAULT_SCENE, DEFAULT_SHOT,
    IDENTITY_FILTER,
};
use kitfusion_contracts::prompt::{assemble_instruction, DEFAULT_INSTRUCTION};
use kitfusion_contracts::receipts::{build_receipt, write_receipt, FusionRequestRecord};
use kitfusion_contracts::request::RequestState;
use kitfusion_contracts::slot::{ImageSlot, SlotChange, SlotEvent, SlotRole};
use serde_json::Map;

use crate::camera::{CameraBackend, CameraSession};
use crate::client::{FusionRequest, FusionResponse, GenerationClient};
use crate::export::export_result;
use crate::media::load_image_file;

pub struct SessionOptions {
    pub out_dir: PathBuf,
    /// Defaults to `<out_dir>/events.jsonl`.
    pub events_path: Option<PathBuf>,
    pub client: Arc<dyn GenerationClient>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    NoCamera,
    NotReady,
    Captured(SlotRole),
    Failed(SlotRole, CaptureFailure),
}

struct PendingFusion {
    receiver: mpsc::Receiver<Result<FusionResponse, GenerationFailure>>,
    handle: Option<thread::JoinHandle<()>>,
    record: FusionRequestRecord,
    started: Instant,
}

struct LiveCamera {
    role: SlotRole,
    session: CameraSession,
}

/// Owns both input slots, the preset selections and the single generation
/// lifecycle. The generation call runs on a worker thread; everything else
/// happens on the caller's thread.
///
/// State transitions never depend on the event log or receipts. A failed
/// write is logged and the session carries on.
pub struct FusionSession {
    person: ImageSlot,
    garment: ImageSlot,
    instruction: String,
    shot: &'static PromptPreset,
    scene: &'static PromptPreset,
    filter: &'static FilterPreset,
    request: RequestState,
    client: Arc<dyn GenerationClient>,
    events: SessionLog,
    out_dir: PathBuf,
    pending: Option<PendingFusion>,
    camera: Option<LiveCamera>,
    receipts_written: u32,
    last_receipt: Option<PathBuf>,
}

impl FusionSession {
    pub fn new(options: SessionOptions) -> Result<Self> {
        let out_dir = options.out_dir;
        fs::create_dir_all(&out_dir)
            .with_context(|| format!("failed to create {}", out_dir.display()))?;
        let events_path = options
            .events_path
            .unwrap_or_else(|| out_dir.join("events.jsonl"));
        let events = SessionLog::open(events_path)?;
        log::info!(
            "session {} started with {} client",
            events.session_id(),
            options.client.name()
        );

        let session = Self {
            person: ImageSlot::new(SlotRole::Person),
            garment: ImageSlot::new(SlotRole::Garment),
            instruction: DEFAULT_INSTRUCTION.to_string(),
            shot: DEFAULT_SHOT,
            scene: DEFAULT_SCENE,
            filter: &IDENTITY_FILTER,
            request: RequestState::Idle,
            client: options.client,
            events,
            out_dir,
            pending: None,
            camera: None,
            receipts_written: 0,
            last_receipt: None,
        };
        session.note(SessionEvent::SessionStarted {
            out_dir: session.out_dir.to_string_lossy().to_string(),
            client: session.client.name().to_string(),
            model: session.client.model().map(str::to_string),
        });
        Ok(session)
    }

    pub fn slot(&self, role: SlotRole) -> &ImageSlot {
        match role {
            SlotRole::Person => &self.person,
            SlotRole::Garment => &self.garment,
        }
    }

    fn slot_mut(&mut self, role: SlotRole) -> &mut ImageSlot {
        match role {
            SlotRole::Person => &mut self.person,
            SlotRole::Garment => &mut self.garment,
        }
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn shot(&self) -> &'static PromptPreset {
        self.shot
    }

    pub fn scene(&self) -> &'static PromptPreset {
        self.scene
    }

    pub fn filter(&self) -> &'static FilterPreset {
        self.filter
    }

    pub fn request_state(&self) -> &RequestState {
        &self.request
    }

    pub fn result(&self) -> Option<&ImagePayload> {
        self.request.result()
    }

    pub fn error(&self) -> Option<&GenerationFailure> {
        self.request.error()
    }

    pub fn client_name(&self) -> &str {
        self.client.name()
    }

    pub fn events(&self) -> &SessionLog {
        &self.events
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn last_receipt(&self) -> Option<&Path> {
        self.last_receipt.as_deref()
    }

    pub fn live_camera(&self) -> Option<SlotRole> {
        self.camera.as_ref().map(|live| live.role)
    }

    fn note(&self, event: SessionEvent) {
        if let Err(err) = self.events.record(&event) {
            log::warn!("dropped {} event: {err:#}", event.name());
        }
    }

    pub fn set_instruction(&mut self, text: &str) {
        self.instruction = text.to_string();
    }

    pub fn select_shot(&mut self, id: &str) -> Result<&'static PromptPreset> {
        let Some(shot) = find_shot(id) else {
            bail!("unknown shot preset: {}", id.trim());
        };
        self.shot = shot;
        Ok(shot)
    }

    pub fn select_scene(&mut self, id: &str) -> Result<&'static PromptPreset> {
        let Some(scene) = find_scene(id) else {
            bail!("unknown scene preset: {}", id.trim());
        };
        self.scene = scene;
        Ok(scene)
    }

    /// Display-only change. The stored result is never touched.
    pub fn select_filter(&mut self, name: &str) -> Result<&'static FilterPreset> {
        let Some(filter) = find_filter(name) else {
            bail!("unknown filter: {}", name.trim());
        };
        self.filter = filter;
        self.note(SessionEvent::FilterSelected {
            filter: filter.name,
            css: filter.css(),
        });
        Ok(filter)
    }

    pub fn apply_slot_event(&mut self, role: SlotRole, event: SlotEvent) -> Option<SlotChange> {
        let failure = match &event {
            SlotEvent::CameraFailed(failure) => Some(failure.clone()),
            _ => None,
        };
        let slot = self.slot_mut(role);
        let before = slot.mode().name();
        let change = slot.apply(event);
        let after = slot.mode().name();
        let mime = slot.image().map(|image| image.mime().to_string());

        if let Some(failure) = failure {
            if self.slot(role).camera_error() == Some(&failure) {
                self.note(SessionEvent::CameraFailed {
                    slot: role.key(),
                    kind: failure.kind(),
                    message: failure.message().to_string(),
                });
            }
        }
        if change.is_some() {
            self.note(SessionEvent::SlotChanged {
                slot: role.key(),
                from: before,
                to: after,
                mime,
            });
        }
        change
    }

    /// Reads `path` into the slot. A filled slot is cleared first so the new
    /// image replaces the old one; a slot with a live camera is left alone.
    pub fn load_file(&mut self, role: SlotRole, path: &Path) -> Result<Option<SlotChange>> {
        let payload = load_image_file(path)?;
        if self.slot(role).is_filled() {
            self.apply_slot_event(role, SlotEvent::Clear);
        }
        Ok(self.apply_slot_event(role, SlotEvent::FileLoaded(payload)))
    }

    /// Opens the camera for `role`. A live camera on the other slot is
    /// cancelled first. Returns whether the camera is live afterwards; a
    /// start failure is recorded on the slot.
    pub fn start_camera(&mut self, role: SlotRole, backend: &dyn CameraBackend) -> bool {
        if self.live_camera() == Some(role) {
            return true;
        }
        if self.slot(role).is_filled() {
            return false;
        }
        if self.camera.is_some() {
            self.cancel_camera();
        }
        match CameraSession::open(backend) {
            Ok(session) => {
                self.apply_slot_event(role, SlotEvent::CameraStarted);
                self.camera = Some(LiveCamera { role, session });
                true
            }
            Err(failure) => {
                self.apply_slot_event(role, SlotEvent::CameraFailed(failure));
                false
            }
        }
    }

    pub fn capture(&mut self, ready_timeout: Duration) -> CaptureOutcome {
        let Some(live) = self.camera.as_mut() else {
            return CaptureOutcome::NoCamera;
        };
        let role = live.role;
        live.session.wait_ready(ready_timeout);
        match live.session.capture() {
            Ok(Some(payload)) => {
                self.camera = None;
                self.apply_slot_event(role, SlotEvent::Captured(payload));
                CaptureOutcome::Captured(role)
            }
            Ok(None) => CaptureOutcome::NotReady,
            Err(failure) => {
                self.camera = None;
                self.apply_slot_event(role, SlotEvent::CameraFailed(failure.clone()));
                CaptureOutcome::Failed(role, failure)
            }
        }
    }

    pub fn cancel_camera(&mut self) -> bool {
        let Some(mut live) = self.camera.take() else {
            return false;
        };
        live.session.stop();
        self.apply_slot_event(live.role, SlotEvent::Cancel);
        true
    }

    pub fn can_generate(&self) -> bool {
        self.person.is_filled()
            && self.garment.is_filled()
            && !self.instruction.trim().is_empty()
            && !self.request.is_in_flight()
    }

    /// Starts one fusion on a worker thread. Returns `false` without touching
    /// any state when inputs are missing or a request is already pending.
    pub fn generate(&mut self) -> bool {
        if !self.can_generate() {
            return false;
        }
        let (Some(person), Some(garment)) = (self.person.image(), self.garment.image()) else {
            return false;
        };
        let Some(in_flight) = self.request.begin() else {
            return false;
        };

        let request = FusionRequest {
            person: person.clone(),
            garment: garment.clone(),
            instruction: assemble_instruction(&self.instruction, self.shot, self.scene),
        };
        let record = FusionRequestRecord {
            instruction: request.instruction.clone(),
            shot: self.shot.id.to_string(),
            scene: self.scene.id.to_string(),
            person_mime: request.person.mime().to_string(),
            garment_mime: request.garment.mime().to_string(),
            client: self.client.name().to_string(),
            model: self.client.model().map(str::to_string),
        };

        self.request = in_flight;
        self.filter = &IDENTITY_FILTER;
        self.note(SessionEvent::GenerationStarted {
            client: record.client.clone(),
            model: record.model.clone(),
            shot: record.shot.clone(),
            scene: record.scene.clone(),
            person_mime: record.person_mime.clone(),
            garment_mime: record.garment_mime.clone(),
        });

        let (tx, rx) = mpsc::channel();
        let client = Arc::clone(&self.client);
        let spawned = thread::Builder::new()
            .name("kitfusion-fuse".to_string())
            .spawn(move || {
                let outcome = client.fuse(&request);
                let _ = tx.send(outcome);
            });
        let mut pending = PendingFusion {
            receiver: rx,
            handle: None,
            record,
            started: Instant::now(),
        };
        match spawned {
            Ok(handle) => {
                pending.handle = Some(handle);
                self.pending = Some(pending);
            }
            Err(err) => {
                let failure = GenerationFailure::transport(format!(
                    "fusion worker spawn failed: {err}"
                ));
                self.complete(pending, Err(failure));
            }
        }
        true
    }

    /// Non-blocking check for a finished fusion. Returns whether one landed.
    pub fn poll(&mut self) -> bool {
        let Some(pending) = self.pending.as_ref() else {
            return false;
        };
        let outcome = match pending.receiver.try_recv() {
            Ok(outcome) => outcome,
            Err(mpsc::TryRecvError::Empty) => return false,
            Err(mpsc::TryRecvError::Disconnected) => Err(worker_lost()),
        };
        self.finish_pending(outcome);
        true
    }

    /// Blocks until the pending fusion lands. Returns `false` if nothing was
    /// pending.
    pub fn wait(&mut self) -> bool {
        let Some(pending) = self.pending.as_ref() else {
            return false;
        };
        let outcome = pending.receiver.recv().unwrap_or_else(|_| Err(worker_lost()));
        self.finish_pending(outcome);
        true
    }

    fn finish_pending(&mut self, outcome: Result<FusionResponse, GenerationFailure>) {
        if let Some(pending) = self.pending.take() {
            self.complete(pending, outcome);
        }
    }

    fn complete(
        &mut self,
        mut pending: PendingFusion,
        outcome: Result<FusionResponse, GenerationFailure>,
    ) {
        if let Some(handle) = pending.handle.take() {
            let _ = handle.join();
        }
        let latency_s = pending.started.elapsed().as_secs_f64();
        let (result, provider_request, provider_response) = match outcome {
            Ok(response) => (
                Ok(response.image),
                response.provider_request,
                response.provider_response,
            ),
            Err(failure) => (Err(failure), Map::new(), Map::new()),
        };

        self.receipts_written += 1;
        let receipt_path = self.out_dir.join(receipt_file_name(
            self.events.session_id(),
            self.receipts_written,
        ));
        let receipt = build_receipt(
            &pending.record,
            &provider_request,
            &provider_response,
            &result,
            latency_s,
            &receipt_path,
        );

        let summary = match &result {
            Ok(image) => {
                log::info!("fusion succeeded in {latency_s:.2}s");
                Ok((image.mime().to_string(), image.approx_bytes()))
            }
            Err(failure) => {
                log::warn!("fusion failed after {latency_s:.2}s: {}", failure.kind());
                Err((failure.kind(), failure.message().to_string()))
            }
        };
        if let Some(next) = self.request.complete(result) {
            self.request = next;
        }

        self.last_receipt = match write_receipt(&receipt_path, &receipt) {
            Ok(()) => Some(receipt_path),
            Err(err) => {
                log::warn!("failed to write {}: {err:#}", receipt_path.display());
                None
            }
        };
        let receipt = self
            .last_receipt
            .as_ref()
            .map(|path| path.to_string_lossy().to_string());
        self.note(match summary {
            Ok((mime, bytes)) => SessionEvent::GenerationSucceeded {
                receipt,
                latency_s,
                mime,
                bytes,
            },
            Err((kind, message)) => SessionEvent::GenerationFailed {
                receipt,
                latency_s,
                kind,
                message,
            },
        });
    }

    /// Bakes the active filter into `jersey-fusion-<filter>.png`. Returns
    /// `None` when there is no result to export.
    pub fn export(&mut self, dir: Option<&Path>) -> Result<Option<PathBuf>> {
        let Some(result) = self.request.result() else {
            return Ok(None);
        };
        let dir = dir.unwrap_or(&self.out_dir);
        let path = export_result(result, self.filter, dir)?;
        self.note(SessionEvent::ExportCreated {
            path: path.to_string_lossy().to_string(),
            filter: self.filter.name,
        });
        Ok(Some(path))
    }

    /// Closes the failure banner. Inputs stay as they are.
    pub fn dismiss_error(&mut self) -> bool {
        match self.request.dismiss() {
            Some(next) => {
                self.request = next;
                true
            }
            None => false,
        }
    }

    /// Releases the camera and records the end of the session. A pending
    /// fusion is abandoned; its worker finishes on its own.
    pub fn finish(&mut self) {
        if let Some(mut live) = self.camera.take() {
            live.session.stop();
        }
        let abandoned = self.pending.take().is_some();
        self.note(SessionEvent::SessionFinished {
            state: self.request.name(),
            abandoned_request: abandoned,
        });
    }
}

fn receipt_file_name(session_id: &str, seq: u32) -> String {
    let short: String = session_id.chars().take(8).collect();
    format!("receipt-{short}-{seq:03}.json")
}

fn worker_lost() -> GenerationFailure {
    GenerationFailure::transport("fusion worker exited without a result")
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::atomic::Ordering;
    use std::sync::{mpsc, Arc, Mutex};
    use std::time::Duration;

    use image::{DynamicImage, Rgba, RgbaImage};
    use kitfusion_contracts::errors::{CaptureFailure, GenerationFailure};
    use kitfusion_contracts::media::ImagePayload;
    use kitfusion_contracts::presets::{find_scene, find_shot};
    use kitfusion_contracts::prompt::assemble_instruction;
    use kitfusion_contracts::request::RequestState;
    use kitfusion_contracts::slot::{SlotEvent, SlotRole};
    use serde_json::{Map, Value};

    use super::{CaptureOutcome, FusionSession, SessionOptions};
    use crate::camera::tests::FakeBackend;
    use crate::client::{FusionRequest, FusionResponse, GenerationClient};
    use crate::media::{encode_png, payload_from_bytes};

    struct FakeClient {
        outcome: Result<ImagePayload, GenerationFailure>,
        gate: Mutex<Option<mpsc::Receiver<()>>>,
        seen: Arc<Mutex<Vec<FusionRequest>>>,
    }

    impl FakeClient {
        fn new(outcome: Result<ImagePayload, GenerationFailure>) -> Self {
            Self {
                outcome,
                gate: Mutex::new(None),
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn gated(outcome: Result<ImagePayload, GenerationFailure>) -> (Self, mpsc::Sender<()>) {
            let (tx, rx) = mpsc::channel();
            let client = Self {
                gate: Mutex::new(Some(rx)),
                ..Self::new(outcome)
            };
            (client, tx)
        }
    }

    impl GenerationClient for FakeClient {
        fn name(&self) -> &str {
            "fake"
        }

        fn fuse(&self, request: &FusionRequest) -> Result<FusionResponse, GenerationFailure> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(request.clone());
            }
            if let Ok(gate) = self.gate.lock() {
                if let Some(rx) = gate.as_ref() {
                    let _ = rx.recv();
                }
            }
            self.outcome.clone().map(|image| FusionResponse {
                image,
                provider_request: Map::new(),
                provider_response: Map::new(),
            })
        }
    }

    fn result_png() -> anyhow::Result<ImagePayload> {
        let image = RgbaImage::from_pixel(3, 3, Rgba([200, 90, 20, 255]));
        let png = encode_png(&DynamicImage::ImageRgba8(image))?;
        Ok(payload_from_bytes(&png, "image/png"))
    }

    fn session_with(dir: &std::path::Path, client: FakeClient) -> anyhow::Result<FusionSession> {
        FusionSession::new(SessionOptions {
            out_dir: dir.to_path_buf(),
            events_path: None,
            client: Arc::new(client),
        })
    }

    fn fill_both(session: &mut FusionSession) -> anyhow::Result<()> {
        session.apply_slot_event(
            SlotRole::Person,
            SlotEvent::FileLoaded(ImagePayload::new("UExBWUVS", "image/jpeg")),
        );
        session.apply_slot_event(
            SlotRole::Garment,
            SlotEvent::FileLoaded(ImagePayload::new("S0lU", "image/webp")),
        );
        Ok(())
    }

    fn event_types(session: &FusionSession) -> anyhow::Result<Vec<String>> {
        let raw = fs::read_to_string(session.events().path())?;
        let mut types = Vec::new();
        for line in raw.lines() {
            let event: Value = serde_json::from_str(line)?;
            types.push(event["type"].as_str().unwrap_or_default().to_string());
        }
        Ok(types)
    }

    #[test]
    fn generate_is_a_no_op_until_inputs_are_complete() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut session = session_with(temp.path(), FakeClient::new(Ok(result_png()?)))?;

        assert!(!session.generate());
        session.apply_slot_event(
            SlotRole::Person,
            SlotEvent::FileLoaded(ImagePayload::new("UExBWUVS", "image/jpeg")),
        );
        assert!(!session.generate());

        fill_both(&mut session)?;
        session.set_instruction("   ");
        assert!(!session.can_generate());
        assert!(!session.generate());
        assert_eq!(session.request_state(), &RequestState::Idle);
        assert!(!event_types(&session)?.contains(&"generation_started".to_string()));
        Ok(())
    }

    #[test]
    fn client_receives_assembled_instruction_and_both_mime_tags() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let client = FakeClient::new(Ok(result_png()?));
        let seen = Arc::clone(&client.seen);
        let mut session = session_with(temp.path(), client)?;
        fill_both(&mut session)?;
        session.set_instruction("Swap the kit.");
        session.select_shot("low_angle")?;
        session.select_scene("stadium")?;

        assert!(session.generate());
        assert!(session.wait());

        let seen = seen.lock().map_err(|_| anyhow::anyhow!("poisoned"))?;
        assert_eq!(seen.len(), 1);
        let expected = assemble_instruction(
            "Swap the kit.",
            find_shot("low_angle").unwrap(),
            find_scene("stadium").unwrap(),
        );
        assert_eq!(seen[0].instruction, expected);
        assert_eq!(seen[0].person.mime(), "image/jpeg");
        assert_eq!(seen[0].garment.mime(), "image/webp");
        assert!(matches!(session.request_state(), RequestState::Succeeded(_)));
        Ok(())
    }

    #[test]
    fn new_generation_resets_filter_and_hides_previous_result() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let (client, release) = FakeClient::gated(Ok(result_png()?));
        let mut session = session_with(temp.path(), client)?;
        fill_both(&mut session)?;

        assert!(session.generate());
        release.send(())?;
        session.wait();
        assert!(session.result().is_some());
        session.select_filter("Mono")?;
        assert_eq!(session.filter().name, "Mono");

        assert!(session.generate());
        assert!(session.request_state().is_in_flight());
        assert!(session.result().is_none());
        assert!(session.error().is_none());
        assert_eq!(session.filter().name, "Original");
        assert!(!session.generate());
        assert!(!session.poll());

        release.send(())?;
        session.wait();
        assert!(session.result().is_some());
        Ok(())
    }

    #[test]
    fn failure_keeps_inputs_and_can_be_dismissed() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let refusal = GenerationFailure::refusal("unsafe content");
        let mut session = session_with(temp.path(), FakeClient::new(Err(refusal.clone())))?;
        fill_both(&mut session)?;

        assert!(session.generate());
        session.wait();
        assert_eq!(session.error(), Some(&refusal));
        assert!(session.slot(SlotRole::Person).is_filled());
        assert!(session.slot(SlotRole::Garment).is_filled());
        assert!(session.can_generate());

        let receipt_path = session.last_receipt().unwrap().to_path_buf();
        let receipt: Value = serde_json::from_str(&fs::read_to_string(receipt_path)?)?;
        assert_eq!(receipt["outcome"]["status"], "failed");
        assert_eq!(receipt["outcome"]["message"], "unsafe content");
        assert_eq!(receipt["request"]["garment_mime"], "image/webp");

        assert!(session.dismiss_error());
        assert_eq!(session.request_state(), &RequestState::Idle);
        assert!(!session.dismiss_error());

        let types = event_types(&session)?;
        assert!(types.contains(&"generation_failed".to_string()));
        Ok(())
    }

    #[test]
    fn unknown_presets_leave_selection_unchanged() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut session = session_with(temp.path(), FakeClient::new(Ok(result_png()?)))?;
        session.select_shot("wide")?;
        assert!(session.select_shot("fisheye").is_err());
        assert_eq!(session.shot().id, "wide");
        assert!(session.select_scene("moon").is_err());
        assert_eq!(session.scene().id, "original");
        assert!(session.select_filter("Noir").is_err());
        assert_eq!(session.filter().name, "Original");
        Ok(())
    }

    #[test]
    fn export_requires_a_result_and_uses_active_filter() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut session = session_with(temp.path(), FakeClient::new(Ok(result_png()?)))?;
        assert!(session.export(None)?.is_none());

        fill_both(&mut session)?;
        session.generate();
        session.wait();
        session.select_filter("sepia")?;
        let path = session.export(None)?.unwrap();
        assert_eq!(
            path.file_name().and_then(|name| name.to_str()),
            Some("jersey-fusion-sepia.png")
        );
        assert_eq!(session.result(), Some(&result_png()?));
        assert!(event_types(&session)?.contains(&"export_created".to_string()));
        Ok(())
    }

    #[test]
    fn one_live_camera_at_a_time() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut session = session_with(temp.path(), FakeClient::new(Ok(result_png()?)))?;
        let person_cam = FakeBackend::ready();
        let garment_cam = FakeBackend::ready();

        assert!(session.start_camera(SlotRole::Person, &person_cam));
        assert!(session.slot(SlotRole::Person).is_camera_active());
        assert!(session.start_camera(SlotRole::Garment, &garment_cam));
        assert_eq!(session.live_camera(), Some(SlotRole::Garment));
        assert!(!session.slot(SlotRole::Person).is_camera_active());
        assert_eq!(person_cam.tracks.stops.load(Ordering::SeqCst), 1);

        let outcome = session.capture(Duration::from_millis(200));
        assert_eq!(outcome, CaptureOutcome::Captured(SlotRole::Garment));
        assert!(session.slot(SlotRole::Garment).is_filled());
        assert_eq!(session.slot(SlotRole::Garment).image().unwrap().mime(), "image/jpeg");
        assert_eq!(garment_cam.tracks.stops.load(Ordering::SeqCst), 1);
        assert_eq!(session.capture(Duration::from_millis(10)), CaptureOutcome::NoCamera);
        Ok(())
    }

    #[test]
    fn camera_start_failure_is_recorded_on_the_slot() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut session = session_with(temp.path(), FakeClient::new(Ok(result_png()?)))?;
        let denied = FakeBackend {
            failure: Some(CaptureFailure::permission_denied()),
            ..FakeBackend::ready()
        };
        assert!(!session.start_camera(SlotRole::Person, &denied));
        assert_eq!(
            session.slot(SlotRole::Person).camera_error(),
            Some(&CaptureFailure::permission_denied())
        );
        assert!(session.live_camera().is_none());
        assert!(event_types(&session)?.contains(&"camera_failed".to_string()));

        let working = FakeBackend::ready();
        assert!(session.start_camera(SlotRole::Person, &working));
        assert!(session.cancel_camera());
        assert!(!session.cancel_camera());
        assert!(session.slot(SlotRole::Person).camera_error().is_none());
        assert_eq!(working.tracks.stops.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[test]
    fn finish_releases_camera_and_logs() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut session = session_with(temp.path(), FakeClient::new(Ok(result_png()?)))?;
        let cam = FakeBackend::ready();
        session.start_camera(SlotRole::Person, &cam);
        session.finish();
        assert!(!cam.tracks.live.load(Ordering::SeqCst));
        let types = event_types(&session)?;
        assert_eq!(types.first().map(String::as_str), Some("session_started"));
        assert_eq!(types.last().map(String::as_str), Some("session_finished"));
        Ok(())
    }

    #[test]
    fn unwritable_receipt_still_completes_the_attempt() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let out = temp.path().join("out");
        let mut session = FusionSession::new(SessionOptions {
            out_dir: out.clone(),
            events_path: Some(temp.path().join("events.jsonl")),
            client: Arc::new(FakeClient::new(Ok(result_png()?))),
        })?;
        fill_both(&mut session)?;

        assert!(session.generate());
        fs::remove_dir_all(&out)?;
        fs::write(&out, b"not a directory")?;
        assert!(session.wait());

        assert!(matches!(session.request_state(), RequestState::Succeeded(_)));
        assert!(session.last_receipt().is_none());
        assert!(session.can_generate());
        assert!(session.generate());
        assert!(session.wait());
        assert!(session.result().is_some());

        let raw = fs::read_to_string(temp.path().join("events.jsonl"))?;
        let succeeded: Vec<Value> = raw
            .lines()
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .filter(|row| row["type"] == "generation_succeeded")
            .collect();
        assert_eq!(succeeded.len(), 2);
        assert_eq!(succeeded[0]["receipt"], Value::Null);
        Ok(())
    }

    #[test]
    fn each_generation_gets_its_own_receipt() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut session = session_with(temp.path(), FakeClient::new(Ok(result_png()?)))?;
        fill_both(&mut session)?;

        session.generate();
        session.wait();
        let first = session.last_receipt().map(|path| path.to_path_buf());
        session.generate();
        session.wait();
        let second = session.last_receipt().map(|path| path.to_path_buf());

        let (Some(first), Some(second)) = (first, second) else {
            anyhow::bail!("both generations should write a receipt");
        };
        assert_ne!(first, second);
        assert!(first.exists());
        assert!(second.exists());
        let name = second.file_name().and_then(|name| name.to_str()).unwrap_or("");
        assert!(name.starts_with("receipt-"));
        assert!(name.ends_with("-002.json"));
        Ok(())
    }

    #[test]
    fn failed_export_keeps_result_and_session_usable() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut session = session_with(temp.path(), FakeClient::new(Ok(result_png()?)))?;
        fill_both(&mut session)?;
        session.generate();
        session.wait();

        let blocker = temp.path().join("blocker");
        fs::write(&blocker, b"x")?;
        assert!(session.export(Some(blocker.join("sub").as_path())).is_err());
        assert_eq!(session.result(), Some(&result_png()?));
        assert!(session.can_generate());
        assert!(session.export(None)?.is_some());
        Ok(())
    }

    #[test]
    fn unopenable_event_log_fails_session_start() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, b"x")?;
        let started = FusionSession::new(SessionOptions {
            out_dir: temp.path().to_path_buf(),
            events_path: Some(blocker.join("events.jsonl")),
            client: Arc::new(FakeClient::new(Ok(result_png()?))),
        });
        assert!(started.is_err());
        Ok(())
    }
}
