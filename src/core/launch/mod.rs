pub mod classpath;
pub mod patches;
pub mod pipeline;
pub mod task;

pub use classpath::{assemble_classpath, extract_natives, join_classpath};
pub use patches::{current_patch, PlatformPatch, PLATFORM_PATCHES};
pub use pipeline::{supervise, KillHandle, LaunchPipeline, LaunchRequest, LaunchStage};
pub use task::{build_game_args, LaunchPlan};
