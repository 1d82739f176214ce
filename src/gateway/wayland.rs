//! Wayland Virtual Keyboard Gateway
//!
//! [`ProtocolGateway`] over a live compositor connection, using the
//! `zwp_virtual_keyboard_v1` protocol (virtual-keyboard-unstable-v1).
//!
//! # Supported Compositors
//!
//! Any compositor advertising `zwp_virtual_keyboard_manager_v1`: Sway,
//! Hyprland, River, labwc and other wlroots-based compositors, KWin.
//! GNOME/Mutter does not implement the protocol.
//!
//! # Lifecycle
//!
//! ```text
//! connect()
//!   ├─> Connection (WAYLAND_DISPLAY socket)
//!   ├─> Registry enumeration
//!   │   ├─> zwp_virtual_keyboard_manager_v1 (v1)
//!   │   └─> wl_seat (first advertised, v1..=7)
//!   └─> zwp_virtual_keyboard_v1 created for the seat
//! drop
//!   └─> zwp_virtual_keyboard_v1.destroy + flush
//! ```

use std::os::fd::AsFd;

use tracing::{debug, info, trace, warn};
use wayland_client::globals::{registry_queue_init, BindError, GlobalListContents};
use wayland_client::protocol::{wl_registry::WlRegistry, wl_seat::WlSeat};
use wayland_client::{Connection, Dispatch, EventQueue, Proxy, QueueHandle};
use wayland_protocols_misc::zwp_virtual_keyboard_v1::client::{
    zwp_virtual_keyboard_manager_v1::ZwpVirtualKeyboardManagerV1,
    zwp_virtual_keyboard_v1::ZwpVirtualKeyboardV1,
};

use crate::error::{Result, WtypeError};
use crate::gateway::{KeyState, KeymapFile, ProtocolGateway};
use crate::keymap::{KeymapDocument, XKB_V1_FORMAT};
use crate::symbols::KeyId;

const NO_MANAGER: &str = "Compositor does not support the virtual keyboard protocol";
const NO_SEAT: &str = "No seat found";

/// Highest wl_seat version we know how to talk to
const MAX_SEAT_VERSION: u32 = 7;

/// Dispatch state; none of the bound objects send events we act on
#[derive(Debug, Default)]
struct GatewayState;

/// Virtual keyboard bound to the compositor's first seat
pub struct WaylandGateway {
    connection: Connection,
    event_queue: EventQueue<GatewayState>,
    state: GatewayState,
    keyboard: ZwpVirtualKeyboardV1,
    _manager: ZwpVirtualKeyboardManagerV1,
    _seat: WlSeat,
}

impl WaylandGateway {
    /// Connect using `WAYLAND_DISPLAY` and create the virtual keyboard
    ///
    /// # Errors
    ///
    /// `Connect` if the display cannot be reached, `MissingCapability` if
    /// the manager or a seat is not advertised.
    pub fn connect() -> Result<Self> {
        let connection = Connection::connect_to_env().map_err(|e| {
            WtypeError::Connect(format!("{} (is WAYLAND_DISPLAY set?)", e))
        })?;
        debug!("Connected to Wayland display");

        Self::from_connection(connection)
    }

    /// Create the virtual keyboard on an existing connection
    pub fn from_connection(connection: Connection) -> Result<Self> {
        let (globals, mut event_queue) = registry_queue_init::<GatewayState>(&connection)
            .map_err(|e| WtypeError::Connect(format!("registry enumeration failed: {}", e)))?;
        let qh = event_queue.handle();

        globals.contents().with_list(|list| {
            debug!("Compositor advertises {} globals", list.len());
            for global in list {
                trace!("  {} v{} (name {})", global.interface, global.version, global.name);
            }
        });

        let manager: ZwpVirtualKeyboardManagerV1 = globals
            .bind(&qh, 1..=1, ())
            .map_err(|e| missing_capability(e, NO_MANAGER))?;
        debug!("Bound zwp_virtual_keyboard_manager_v1");

        let seat: WlSeat = globals
            .bind(&qh, 1..=MAX_SEAT_VERSION, ())
            .map_err(|e| missing_capability(e, NO_SEAT))?;
        debug!("Bound wl_seat v{}", seat.version());

        let keyboard = manager.create_virtual_keyboard(&seat, &qh, ());

        let mut state = GatewayState;
        event_queue
            .roundtrip(&mut state)
            .map_err(|e| WtypeError::Protocol(format!("virtual keyboard setup failed: {}", e)))?;

        info!("Virtual keyboard created");

        Ok(Self {
            connection,
            event_queue,
            state,
            keyboard,
            _manager: manager,
            _seat: seat,
        })
    }
}

fn missing_capability(error: BindError, message: &'static str) -> WtypeError {
    debug!("Global bind failed: {}", error);
    WtypeError::MissingCapability(message)
}

impl ProtocolGateway for WaylandGateway {
    fn upload_keymap(&mut self, keymap: &KeymapDocument) -> Result<()> {
        let file = KeymapFile::create(keymap)?;
        self.keyboard.keymap(XKB_V1_FORMAT, file.as_fd(), file.len());

        // The fd must reach the socket before `file` closes it
        self.connection
            .flush()
            .map_err(|e| WtypeError::Protocol(format!("failed to send keymap: {}", e)))?;

        debug!(
            "Uploaded keymap: {} bytes, {} keycodes, max keycode {}",
            keymap.size(),
            keymap.entry_count(),
            keymap.max_keycode()
        );
        Ok(())
    }

    fn send_key(&mut self, time: u32, key: KeyId, state: KeyState) -> Result<()> {
        debug!("key {} {:?} at {}ms", key, state, time);
        self.keyboard.key(time, key.get(), state.wire_value());
        Ok(())
    }

    fn send_modifiers(
        &mut self,
        depressed: u32,
        latched: u32,
        locked: u32,
        group: u32,
    ) -> Result<()> {
        debug!(
            "modifiers depressed={:#x} latched={:#x} locked={:#x} group={}",
            depressed,
            latched,
            locked,
            group
        );
        self.keyboard.modifiers(depressed, latched, locked, group);
        Ok(())
    }

    fn barrier(&mut self) -> Result<()> {
        self.event_queue
            .roundtrip(&mut self.state)
            .map_err(|e| WtypeError::Protocol(e.to_string()))?;
        Ok(())
    }
}

impl Drop for WaylandGateway {
    fn drop(&mut self) {
        self.keyboard.destroy();
        if let Err(e) = self.connection.flush() {
            warn!("Failed to flush virtual keyboard destruction: {}", e);
        }
        debug!("Virtual keyboard destroyed");
    }
}

impl Dispatch<WlRegistry, GlobalListContents> for GatewayState {
    fn event(
        _state: &mut Self,
        _proxy: &WlRegistry,
        _event: <WlRegistry as Proxy>::Event,
        _data: &GlobalListContents,
        _conn: &Connection,
        _qhandle: &QueueHandle<Self>,
    ) {
        // Global list is maintained by registry_queue_init
    }
}

impl Dispatch<WlSeat, ()> for GatewayState {
    fn event(
        _state: &mut Self,
        _proxy: &WlSeat,
        _event: <WlSeat as Proxy>::Event,
        _data: &(),
        _conn: &Connection,
        _qhandle: &QueueHandle<Self>,
    ) {
        // Capabilities and name are irrelevant for a virtual keyboard
    }
}

impl Dispatch<ZwpVirtualKeyboardManagerV1, ()> for GatewayState {
    fn event(
        _state: &mut Self,
        _proxy: &ZwpVirtualKeyboardManagerV1,
        _event: <ZwpVirtualKeyboardManagerV1 as Proxy>::Event,
        _data: &(),
        _conn: &Connection,
        _qhandle: &QueueHandle<Self>,
    ) {
    }
}

impl Dispatch<ZwpVirtualKeyboardV1, ()> for GatewayState {
    fn event(
        _state: &mut Self,
        _proxy: &ZwpVirtualKeyboardV1,
        _event: <ZwpVirtualKeyboardV1 as Proxy>::Event,
        _data: &(),
        _conn: &Connection,
        _qhandle: &QueueHandle<Self>,
    ) {
    }
}
