use std::time::Duration;

/// Default width (in pixels) of the hosted surface.
pub const DEFAULT_WINDOW_WIDTH: i32 = 854;

/// Default height (in pixels) of the hosted surface.
pub const DEFAULT_WINDOW_HEIGHT: i32 = 480;

/// Size of the bare frame before a component is attached.
pub const INITIAL_FRAME_WIDTH: i32 = 800;
pub const INITIAL_FRAME_HEIGHT: i32 = 600;

/// How long a close request may spend in stop/destroy before the process is killed.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_millis(3000);

/// Origin reported to the component in place of the page it was embedded in.
pub const DEFAULT_DOCUMENT_BASE: &str = "http://www.minecraft.net/game";

/// Type holding the application's static state, including its working directory.
pub const STATE_HOLDER_TYPE: &str = "net.minecraft.client.Minecraft";

/// Applet-like entry component hosted inside the window.
pub const ENTRY_COMPONENT_TYPE: &str = "net.minecraft.client.MinecraftApplet";

/// Static method invoked in compatibility mode.
pub const ENTRY_POINT_METHOD: &str = "main";

/// Name handed to the working-directory probe after patching.
pub const APPLICATION_DIR_NAME: &str = "minecraft";

/// Archive stems, resolved to platform library file names under `<root>/bin`.
pub const ARCHIVE_STEMS: &[&str] = &["minecraft", "lwjgl", "lwjgl_util", "jinput"];

pub const BIN_DIR: &str = "bin";
pub const NATIVES_DIR: &str = "natives";

/// Environment variables the native subsystems read their library path from.
pub const NATIVE_PATH_VARS: &[&str] = &["ORG_LWJGL_LIBRARYPATH", "NET_JAVA_GAMES_INPUT_LIBRARYPATH"];

/// Variable the component derives its default data directory from.
#[cfg(windows)]
pub const HOME_VAR: &str = "APPDATA";
#[cfg(not(windows))]
pub const HOME_VAR: &str = "HOME";

/// Exported symbol every archive provides its module manifest through.
pub const MANIFEST_SYMBOL: &str = "client_module_manifest";

/// Prefix for environment overrides of the launcher settings.
pub const SETTINGS_ENV_PREFIX: &str = "CLIENT_LAUNCHER_";

/// Optional settings file looked up in the install root.
pub const SETTINGS_FILE: &str = "launcher.toml";

/// Mode tokens accepted as the fifth positional argument.
pub const MODE_COMPAT: &str = "compatmode";
pub const MODE_MAXIMIZE: &str = "max";
