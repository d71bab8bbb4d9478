/// Application name, used in log output and the CLI.
pub const APP_NAME: &str = "patchbuild";

/// File name of the serialized patch manifest inside a package directory.
pub const PATCH_MANIFEST_FILE: &str = "patch_manifest.json";

/// File name of the human-readable build report inside a package directory.
pub const BUILD_REPORT_FILE: &str = "build_report.txt";

/// Name of the working output directory below `<root>/<platform>/`.
pub const OUTPUT_DIR_NAME: &str = "output";

/// Current manifest serialization format.
pub const MANIFEST_FORMAT: u32 = 1;

/// Default project file name looked up by the CLI.
pub const PROJECT_FILE: &str = "patchbuild.json";
