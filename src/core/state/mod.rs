pub mod app_state;
pub mod process;
pub mod system_info;

pub use app_state::{AppState, LauncherSettings, DEFAULT_SERVER_URL, GAME_VERSION};
pub use process::{ProcessSlot, SlotReservation};
pub use system_info::SystemInfo;
