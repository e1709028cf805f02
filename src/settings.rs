use std::path::PathBuf;

use crate::canvas::Size;

/// User preferences, persisted as `key=value` lines.
///
/// Unknown keys and unparsable values fall back to the defaults, so an old or
/// hand-edited file never prevents startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaintSettings {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub brush_size: u32,
    pub refresh_rate: u32,
    pub checker_cell: u32,
    pub resize_preset_width: u32,
    pub resize_preset_height: u32,
}

impl Default for PaintSettings {
    fn default() -> Self {
        Self {
            canvas_width: 400,
            canvas_height: 400,
            brush_size: 1,
            refresh_rate: 60,
            checker_cell: 8,
            resize_preset_width: 1000,
            resize_preset_height: 1000,
        }
    }
}

impl PaintSettings {
    pub fn canvas_size(&self) -> Size {
        Size::new(self.canvas_width, self.canvas_height)
    }

    pub fn resize_preset(&self) -> Size {
        Size::new(self.resize_preset_width, self.resize_preset_height)
    }

    pub(crate) fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
                    PathBuf::from(home).join(".config")
                })
                .join("paintring");
            let _ = std::fs::create_dir_all(&config_dir);
            return Some(config_dir.join("paintring_settings.cfg"));
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA")
                .or_else(|_| std::env::var("USERPROFILE"))
                .ok()?;
            let config_dir = PathBuf::from(appdata).join("PaintRing");
            let _ = std::fs::create_dir_all(&config_dir);
            return Some(config_dir.join("paintring_settings.cfg"));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
            let config_dir = PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("PaintRing");
            let _ = std::fs::create_dir_all(&config_dir);
            return Some(config_dir.join("paintring_settings.cfg"));
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|d| d.join("paintring_settings.cfg")))
        }
    }

    pub fn to_cfg_string(&self) -> String {
        format!(
            "canvas_width={}\n\
             canvas_height={}\n\
             brush_size={}\n\
             refresh_rate={}\n\
             checker_cell={}\n\
             resize_preset_width={}\n\
             resize_preset_height={}\n",
            self.canvas_width,
            self.canvas_height,
            self.brush_size,
            self.refresh_rate,
            self.checker_cell,
            self.resize_preset_width,
            self.resize_preset_height,
        )
    }

    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let Some((key, val)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            // Zero is never a valid value for any of these.
            let Some(val) = val.trim().parse::<u32>().ok().filter(|v| *v > 0) else {
                log::warn!("settings: ignoring invalid value for {key}");
                continue;
            };
            match key {
                "canvas_width" => s.canvas_width = val,
                "canvas_height" => s.canvas_height = val,
                "brush_size" => s.brush_size = val,
                "refresh_rate" => s.refresh_rate = val,
                "checker_cell" => s.checker_cell = val,
                "resize_preset_width" => s.resize_preset_width = val,
                "resize_preset_height" => s.resize_preset_height = val,
                _ => log::debug!("settings: unknown key {key}"),
            }
        }
        s
    }

    pub fn save(&self) {
        let Some(path) = Self::settings_path() else {
            return;
        };
        if let Err(e) = std::fs::write(&path, self.to_cfg_string()) {
            log::warn!("failed to save settings to {}: {e}", path.display());
        }
    }

    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            return Self::default();
        };
        let Ok(content) = std::fs::read_to_string(&path) else {
            return Self::default();
        };
        Self::parse(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_startup_canvas() {
        let s = PaintSettings::default();
        assert_eq!(s.canvas_size(), Size::new(400, 400));
        assert_eq!(s.resize_preset(), Size::new(1000, 1000));
        assert_eq!(s.brush_size, 1);
    }

    #[test]
    fn written_settings_parse_back() {
        let s = PaintSettings {
            canvas_width: 640,
            brush_size: 4,
            refresh_rate: 144,
            ..PaintSettings::default()
        };
        assert_eq!(PaintSettings::parse(&s.to_cfg_string()), s);
    }

    #[test]
    fn bad_lines_fall_back_to_defaults() {
        let s = PaintSettings::parse(
            "canvas_width=abc\nbrush_size=0\nnot a setting\ncolor_scheme=dark\n checker_cell = 16 \n",
        );
        assert_eq!(s.canvas_width, 400);
        assert_eq!(s.brush_size, 1);
        assert_eq!(s.checker_cell, 16);
    }
}
