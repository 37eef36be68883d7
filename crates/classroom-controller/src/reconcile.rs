//! Stream lifecycle controller.
//!
//! Keeps the actual camera/microphone publish state consistent with the
//! desired flags carried on the local main-stream descriptor. Runs on every
//! relevant event; a pass with nothing to change issues no device calls, so
//! back-to-back reconciliations are externally silent.

use classroom_protocol::StreamDescriptor;
use tracing::debug;

use crate::errors::ClassError;
use crate::transport::{DeviceKind, MediaDevices};

/// Desired-vs-actual reconciler for the local outbound devices.
///
/// Owns the cached local main-stream descriptor and the last actuated
/// open/closed state per device. Device failures abort the pass and surface
/// to the caller; the next triggering event re-attempts.
#[derive(Debug, Default)]
pub struct StreamReconciler {
    local_main: Option<StreamDescriptor>,
    camera_open: bool,
    microphone_open: bool,
}

impl StreamReconciler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached local main-stream descriptor from the last reconciliation.
    #[must_use]
    pub fn local_main(&self) -> Option<&StreamDescriptor> {
        self.local_main.as_ref()
    }

    /// Whether the camera is currently open (publishing).
    #[must_use]
    pub const fn camera_open(&self) -> bool {
        self.camera_open
    }

    /// Whether the microphone is currently open (publishing).
    #[must_use]
    pub const fn microphone_open(&self) -> bool {
        self.microphone_open
    }

    /// Reconcile device state against the local main-stream descriptor.
    ///
    /// 1. Descriptor absent or offline: clear the cached descriptor, done.
    /// 2. Probe both devices; a probe failure aborts the pass.
    /// 3. Not attached to the media transport: cache the descriptor but do
    ///    not actuate devices.
    /// 4. Per available device, open/close only when the desired flag
    ///    differs from the last actuated state.
    pub async fn reconcile(
        &mut self,
        descriptor: Option<&StreamDescriptor>,
        attached: bool,
        devices: &dyn MediaDevices,
    ) -> Result<(), ClassError> {
        let Some(desc) = descriptor.filter(|d| d.online) else {
            self.local_main = None;
            return Ok(());
        };
        self.local_main = Some(desc.clone());

        let camera_available = devices.probe(DeviceKind::Camera).await?;
        let microphone_available = devices.probe(DeviceKind::Microphone).await?;

        if !attached {
            return Ok(());
        }

        if camera_available {
            let desired = desc.video_state.is_on();
            if desired != self.camera_open {
                self.actuate(DeviceKind::Camera, desired, devices).await?;
                self.camera_open = desired;
            }
        }

        if microphone_available {
            let desired = desc.audio_state.is_on();
            if desired != self.microphone_open {
                self.actuate(DeviceKind::Microphone, desired, devices)
                    .await?;
                self.microphone_open = desired;
            }
        }

        Ok(())
    }

    /// Force one device open or closed (local mute path).
    ///
    /// Suppressed when the device is already in the requested state.
    pub async fn set_device(
        &mut self,
        device: DeviceKind,
        open: bool,
        devices: &dyn MediaDevices,
    ) -> Result<(), ClassError> {
        let current = match device {
            DeviceKind::Camera => self.camera_open,
            DeviceKind::Microphone => self.microphone_open,
        };
        if current == open {
            return Ok(());
        }
        self.actuate(device, open, devices).await?;
        match device {
            DeviceKind::Camera => self.camera_open = open,
            DeviceKind::Microphone => self.microphone_open = open,
        }
        Ok(())
    }

    async fn actuate(
        &self,
        device: DeviceKind,
        open: bool,
        devices: &dyn MediaDevices,
    ) -> Result<(), ClassError> {
        debug!(
            target: "class.reconcile",
            device = device.as_str(),
            open,
            "actuating device"
        );
        if open {
            devices.open(device).await
        } else {
            devices.close(device).await
        }
    }

    /// Forget everything; used on session reset.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use classroom_protocol::MediaState;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    /// Device mock counting probe/open/close calls per device.
    #[derive(Default)]
    struct CountingDevices {
        camera_available: AtomicBool,
        microphone_available: AtomicBool,
        probe_fails: AtomicBool,
        probes: AtomicU32,
        camera_opens: AtomicU32,
        camera_closes: AtomicU32,
        microphone_opens: AtomicU32,
        microphone_closes: AtomicU32,
    }

    impl CountingDevices {
        fn all_available() -> Self {
            let devices = Self::default();
            devices.camera_available.store(true, Ordering::SeqCst);
            devices.microphone_available.store(true, Ordering::SeqCst);
            devices
        }
    }

    #[async_trait]
    impl MediaDevices for CountingDevices {
        async fn probe(&self, device: DeviceKind) -> Result<bool, ClassError> {
            if self.probe_fails.load(Ordering::SeqCst) {
                return Err(ClassError::Device("probe failed".to_string()));
            }
            self.probes.fetch_add(1, Ordering::SeqCst);
            Ok(match device {
                DeviceKind::Camera => self.camera_available.load(Ordering::SeqCst),
                DeviceKind::Microphone => self.microphone_available.load(Ordering::SeqCst),
            })
        }

        async fn open(&self, device: DeviceKind) -> Result<(), ClassError> {
            match device {
                DeviceKind::Camera => self.camera_opens.fetch_add(1, Ordering::SeqCst),
                DeviceKind::Microphone => self.microphone_opens.fetch_add(1, Ordering::SeqCst),
            };
            Ok(())
        }

        async fn close(&self, device: DeviceKind) -> Result<(), ClassError> {
            match device {
                DeviceKind::Camera => self.camera_closes.fetch_add(1, Ordering::SeqCst),
                DeviceKind::Microphone => self.microphone_closes.fetch_add(1, Ordering::SeqCst),
            };
            Ok(())
        }
    }

    fn live_descriptor() -> StreamDescriptor {
        StreamDescriptor::live_camera("s1", "u1")
    }

    #[tokio::test]
    async fn test_reconcile_opens_desired_devices() {
        let devices = CountingDevices::all_available();
        let mut reconciler = StreamReconciler::new();
        let desc = live_descriptor();

        reconciler
            .reconcile(Some(&desc), true, &devices)
            .await
            .unwrap();

        assert!(reconciler.camera_open());
        assert!(reconciler.microphone_open());
        assert_eq!(devices.camera_opens.load(Ordering::SeqCst), 1);
        assert_eq!(devices.microphone_opens.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent() {
        let devices = CountingDevices::all_available();
        let mut reconciler = StreamReconciler::new();
        let desc = live_descriptor();

        reconciler
            .reconcile(Some(&desc), true, &devices)
            .await
            .unwrap();
        reconciler
            .reconcile(Some(&desc), true, &devices)
            .await
            .unwrap();

        // Second pass with no new event issues no additional open/close
        assert_eq!(devices.camera_opens.load(Ordering::SeqCst), 1);
        assert_eq!(devices.microphone_opens.load(Ordering::SeqCst), 1);
        assert_eq!(devices.camera_closes.load(Ordering::SeqCst), 0);
        assert_eq!(devices.microphone_closes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_reconcile_closes_on_disabled_flags() {
        let devices = CountingDevices::all_available();
        let mut reconciler = StreamReconciler::new();
        let mut desc = live_descriptor();

        reconciler
            .reconcile(Some(&desc), true, &devices)
            .await
            .unwrap();

        desc.video_state = MediaState::Off;
        reconciler
            .reconcile(Some(&desc), true, &devices)
            .await
            .unwrap();

        assert!(!reconciler.camera_open());
        assert!(reconciler.microphone_open());
        assert_eq!(devices.camera_closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_offline_descriptor_clears_cache_without_calls() {
        let devices = CountingDevices::all_available();
        let mut reconciler = StreamReconciler::new();
        let mut desc = live_descriptor();
        desc.online = false;

        reconciler
            .reconcile(Some(&desc), true, &devices)
            .await
            .unwrap();

        assert!(reconciler.local_main().is_none());
        assert_eq!(devices.probes.load(Ordering::SeqCst), 0);
        assert_eq!(devices.camera_opens.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_probe_failure_aborts_pass() {
        let devices = CountingDevices::all_available();
        devices.probe_fails.store(true, Ordering::SeqCst);
        let mut reconciler = StreamReconciler::new();
        let desc = live_descriptor();

        let result = reconciler.reconcile(Some(&desc), true, &devices).await;

        assert!(matches!(result, Err(ClassError::Device(_))));
        assert!(!reconciler.camera_open());
        assert_eq!(devices.camera_opens.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_not_attached_skips_actuation() {
        let devices = CountingDevices::all_available();
        let mut reconciler = StreamReconciler::new();
        let desc = live_descriptor();

        reconciler
            .reconcile(Some(&desc), false, &devices)
            .await
            .unwrap();

        // Descriptor cached, devices untouched
        assert!(reconciler.local_main().is_some());
        assert!(!reconciler.camera_open());
        assert_eq!(devices.camera_opens.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unavailable_device_is_not_actuated() {
        let devices = CountingDevices::all_available();
        devices.camera_available.store(false, Ordering::SeqCst);
        let mut reconciler = StreamReconciler::new();
        let desc = live_descriptor();

        reconciler
            .reconcile(Some(&desc), true, &devices)
            .await
            .unwrap();

        assert!(!reconciler.camera_open());
        assert!(reconciler.microphone_open());
        assert_eq!(devices.camera_opens.load(Ordering::SeqCst), 0);
        assert_eq!(devices.microphone_opens.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_set_device_suppresses_redundant_calls() {
        let devices = CountingDevices::all_available();
        let mut reconciler = StreamReconciler::new();

        reconciler
            .set_device(DeviceKind::Camera, true, &devices)
            .await
            .unwrap();
        reconciler
            .set_device(DeviceKind::Camera, true, &devices)
            .await
            .unwrap();
        assert_eq!(devices.camera_opens.load(Ordering::SeqCst), 1);

        reconciler
            .set_device(DeviceKind::Camera, false, &devices)
            .await
            .unwrap();
        assert_eq!(devices.camera_closes.load(Ordering::SeqCst), 1);
        assert!(!reconciler.camera_open());
    }
}
