use std::fmt::Formatter;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub rom_file_path: String,
    pub debug_logging: bool,
    pub serial_out_path: Option<PathBuf>,
    pub window_width: u32,
    pub window_height: u32,
    pub vsync_enabled: bool,
}

impl std::fmt::Display for RunConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "rom_file_path: {}", self.rom_file_path)?;
        writeln!(f, "debug_logging: {}", self.debug_logging)?;
        writeln!(
            f,
            "serial_out_path: {}",
            match &self.serial_out_path {
                Some(path) => path.display().to_string(),
                None => "<None>".into(),
            }
        )?;
        writeln!(f, "window_width: {}", self.window_width)?;
        writeln!(f, "window_height: {}", self.window_height)?;
        writeln!(f, "vsync_enabled: {}", self.vsync_enabled)?;

        Ok(())
    }
}
