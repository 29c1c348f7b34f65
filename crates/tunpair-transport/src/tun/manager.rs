// ============================================
// File: crates/tunpair-transport/src/tun/manager.rs
// ============================================
//! # Virtual Interface Manager
//!
//! ## Creation Reason
//! Owns the local tun/tap device for a run: creates it once, configures it
//! once, and hands the configured interface to the forwarding engine.
//!
//! ## Main Functionality
//! - `DeviceFactory`: how a device is opened (kernel or mock)
//! - `InterfaceManager::create`: open a device of the requested kind
//! - `InterfaceManager::configure`: address, link up, MTU, in that order
//! - `VirtualInterface`: the configured device plus its settings
//!
//! ## ⚠️ Important Note for Next Developer
//! - Configuration stops at the first failing step; nothing is rolled back
//! - There is no teardown: the device goes away when the last handle drops
//!
//! ## Last Modified
//! v0.1.0 - Initial interface manager

use std::sync::Arc;

use tracing::{debug, info};

use tunpair_common::{InterfaceAddress, InterfaceKind};

use crate::configurator::{InterfaceConfigurator, IpCommandConfigurator};
use crate::error::Result;
use crate::traits::{TunConfig, TunDevice};

// ============================================
// DeviceFactory
// ============================================

/// Opens virtual devices.
pub trait DeviceFactory: Send + Sync {
    /// Opens a device as described by `config`.
    ///
    /// # Errors
    /// Returns a device-unavailable error (`TunCreateFailed` or
    /// `PermissionDenied`) if the device cannot be opened.
    fn open(&self, config: &TunConfig) -> Result<Arc<dyn TunDevice>>;
}

/// Opens real devices through the kernel.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDeviceFactory;

impl DeviceFactory for SystemDeviceFactory {
    #[cfg(target_os = "linux")]
    fn open(&self, config: &TunConfig) -> Result<Arc<dyn TunDevice>> {
        let tun = super::linux::LinuxTun::create(config.clone())?;
        Ok(Arc::new(tun))
    }

    #[cfg(not(target_os = "linux"))]
    fn open(&self, config: &TunConfig) -> Result<Arc<dyn TunDevice>> {
        Err(crate::error::TransportError::tun_create_failed(
            config.kind,
            &config.name,
            "virtual devices are only supported on Linux",
        ))
    }
}

// ============================================
// VirtualInterface
// ============================================

/// A created and configured virtual interface.
#[derive(Clone)]
pub struct VirtualInterface {
    device: Arc<dyn TunDevice>,
    address: InterfaceAddress,
    mtu: u16,
}

impl VirtualInterface {
    /// Returns the shared device handle.
    #[must_use]
    pub fn device(&self) -> &Arc<dyn TunDevice> {
        &self.device
    }

    /// Returns the device name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.device.name()
    }

    /// Returns the device kind.
    #[must_use]
    pub fn kind(&self) -> InterfaceKind {
        self.device.kind()
    }

    /// Returns the assigned address.
    #[must_use]
    pub const fn address(&self) -> InterfaceAddress {
        self.address
    }

    /// Returns the configured MTU.
    #[must_use]
    pub const fn mtu(&self) -> u16 {
        self.mtu
    }
}

impl std::fmt::Debug for VirtualInterface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualInterface")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .field("address", &self.address)
            .field("mtu", &self.mtu)
            .finish()
    }
}

// ============================================
// InterfaceManager
// ============================================

/// Creates and configures the local virtual interface.
#[derive(Debug)]
pub struct InterfaceManager<F, C> {
    factory: F,
    configurator: C,
}

impl InterfaceManager<SystemDeviceFactory, IpCommandConfigurator> {
    /// Manager for real devices configured with `ip`.
    #[must_use]
    pub fn system() -> Self {
        Self::new(SystemDeviceFactory, IpCommandConfigurator::new())
    }
}

impl<F: DeviceFactory, C: InterfaceConfigurator> InterfaceManager<F, C> {
    /// Creates a manager from a device factory and a configurator.
    #[must_use]
    pub const fn new(factory: F, configurator: C) -> Self {
        Self {
            factory,
            configurator,
        }
    }

    /// Returns the configurator.
    #[must_use]
    pub const fn configurator(&self) -> &C {
        &self.configurator
    }

    /// Creates a device of `kind`.
    ///
    /// An empty or absent `name_hint` lets the kernel choose the name.
    ///
    /// # Errors
    /// Returns a device-unavailable error if the device cannot be opened,
    /// or `InvalidConfig` if the name hint is unusable.
    pub fn create(&self, kind: InterfaceKind, name_hint: Option<&str>) -> Result<Arc<dyn TunDevice>> {
        let config = TunConfig::new(kind).with_name(name_hint.unwrap_or_default());
        config.validate()?;

        let device = self.factory.open(&config)?;
        info!(name = %device.name(), %kind, "Virtual device created");
        Ok(device)
    }

    /// Configures `device`: assign address, bring link up, set MTU.
    ///
    /// # Errors
    /// Returns `TunConfigFailed` naming the first step that failed.
    pub async fn configure(
        &self,
        device: Arc<dyn TunDevice>,
        address: InterfaceAddress,
        mtu: u16,
    ) -> Result<VirtualInterface> {
        let name = device.name().to_owned();

        debug!(device = %name, %address, "Assigning address");
        self.configurator.assign_address(&name, address).await?;

        debug!(device = %name, "Bringing link up");
        self.configurator.link_up(&name).await?;

        debug!(device = %name, mtu, "Setting MTU");
        self.configurator.set_mtu(&name, mtu).await?;

        info!(device = %name, %address, mtu, "Virtual interface configured");

        Ok(VirtualInterface {
            device,
            address,
            mtu,
        })
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::configurator::{ConfigCall, ConfigStep, RecordingConfigurator};
    use crate::error::TransportError;
    use crate::tun::mock::{MockDeviceFactory, MockTun};

    fn address() -> InterfaceAddress {
        InterfaceAddress::new(Ipv4Addr::new(10, 253, 0, 1), 30)
    }

    #[tokio::test]
    async fn test_create_and_configure_in_order() {
        let tun = Arc::new(MockTun::new("tap3", InterfaceKind::Tap));
        let manager = InterfaceManager::new(
            MockDeviceFactory::new(Arc::clone(&tun)),
            RecordingConfigurator::new(),
        );

        let device = manager.create(InterfaceKind::Tap, None).unwrap();
        let iface = manager.configure(device, address(), 1400).await.unwrap();

        assert_eq!(iface.name(), "tap3");
        assert_eq!(iface.kind(), InterfaceKind::Tap);
        assert_eq!(iface.mtu(), 1400);
        assert_eq!(iface.address().to_string(), "10.253.0.1/30");
        assert_eq!(
            manager.configurator().calls(),
            vec![
                ConfigCall::AssignAddress("tap3".into(), address()),
                ConfigCall::LinkUp("tap3".into()),
                ConfigCall::SetMtu("tap3".into(), 1400),
            ]
        );
    }

    #[tokio::test]
    async fn test_configure_stops_at_failed_step() {
        let manager = InterfaceManager::new(
            MockDeviceFactory::new(Arc::new(MockTun::default())),
            RecordingConfigurator::failing_at(ConfigStep::AssignAddress),
        );

        let device = manager.create(InterfaceKind::Tun, Some("tun9")).unwrap();
        let err = manager.configure(device, address(), 1500).await.unwrap_err();

        assert!(matches!(
            err,
            TransportError::TunConfigFailed {
                step: ConfigStep::AssignAddress,
                ..
            }
        ));
        assert_eq!(manager.configurator().calls().len(), 1);
    }

    #[test]
    fn test_create_passes_kind_and_name() {
        let factory = MockDeviceFactory::new(Arc::new(MockTun::default()));
        let manager = InterfaceManager::new(factory, RecordingConfigurator::new());

        manager.create(InterfaceKind::Tap, Some("tp0")).unwrap();

        let requested = manager.factory.requested();
        assert_eq!(requested, vec![TunConfig::new(InterfaceKind::Tap).with_name("tp0")]);
    }

    #[test]
    fn test_created_device_shows_in_debug_output() {
        let factory = MockDeviceFactory::new(Arc::new(MockTun::new("tun7", InterfaceKind::Tun)));
        let manager = InterfaceManager::new(factory, RecordingConfigurator::new());

        let device = manager.create(InterfaceKind::Tun, None).unwrap();
        assert!(format!("{device:?}").contains("tun7"));
    }

    #[test]
    fn test_create_unavailable_device() {
        let manager = InterfaceManager::new(MockDeviceFactory::unavailable(), RecordingConfigurator::new());

        let err = manager.create(InterfaceKind::Tun, None).unwrap_err();
        assert!(err.is_device_unavailable());
    }

    #[test]
    fn test_create_rejects_bad_name_hint() {
        let manager = InterfaceManager::new(
            MockDeviceFactory::new(Arc::new(MockTun::default())),
            RecordingConfigurator::new(),
        );

        let err = manager.create(InterfaceKind::Tun, Some("far too long a name")).unwrap_err();
        assert!(matches!(err, TransportError::InvalidConfig { .. }));
        assert!(manager.factory.requested().is_empty());
    }
}
