//! Tracer configuration.

use std::str::FromStr;

use crate::dispatch::DispatchRounding;

/// When camera/resolution uniforms are written to the GPU.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum UniformRefresh {
    /// Write at init and whenever the camera or target resolution changes.
    #[default]
    OnChange,
    /// Write only at init; later camera moves and resizes are ignored.
    Once,
}

/// Tracer configuration. Keep it small; add fields only for a concrete need.
#[derive(Debug, Clone)]
pub struct TracerConfig {
    /// Prefix for wgpu object labels.
    pub label: String,
    /// Compute entry point in the kernel source.
    pub entry_point: String,
    pub dispatch_rounding: DispatchRounding,
    pub uniform_refresh: UniformRefresh,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            label: "prism tracer".to_string(),
            entry_point: "CSMain".to_string(),
            dispatch_rounding: DispatchRounding::default(),
            uniform_refresh: UniformRefresh::default(),
        }
    }
}

impl TracerConfig {
    /// Applies `PRISM_DISPATCH` (`ceil`/`truncate`) and `PRISM_UNIFORMS`
    /// (`on-change`/`once`) overrides. Unparsable values are logged and ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_override("PRISM_DISPATCH") {
            self.dispatch_rounding = v;
        }
        if let Some(v) = env_override("PRISM_UNIFORMS") {
            self.uniform_refresh = v;
        }
        self
    }
}

fn env_override<T: FromStr<Err = String>>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(e) => {
            log::warn!("ignoring {key}: {e}");
            None
        }
    }
}

impl FromStr for DispatchRounding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ceil" => Ok(Self::Ceil),
            "truncate" | "trunc" => Ok(Self::Truncate),
            other => Err(format!("unknown dispatch rounding {other:?} (expected ceil|truncate)")),
        }
    }
}

impl FromStr for UniformRefresh {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on-change" | "onchange" | "change" => Ok(Self::OnChange),
            "once" => Ok(Self::Once),
            other => Err(format!("unknown uniform refresh {other:?} (expected on-change|once)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = TracerConfig::default();
        assert_eq!(cfg.entry_point, "CSMain");
        assert_eq!(cfg.dispatch_rounding, DispatchRounding::Ceil);
        assert_eq!(cfg.uniform_refresh, UniformRefresh::OnChange);
    }

    #[test]
    fn parse_rounding() {
        assert_eq!("Truncate".parse::<DispatchRounding>(), Ok(DispatchRounding::Truncate));
        assert_eq!(" ceil ".parse::<DispatchRounding>(), Ok(DispatchRounding::Ceil));
        assert!("floor".parse::<DispatchRounding>().is_err());
    }

    #[test]
    fn parse_refresh() {
        assert_eq!("once".parse::<UniformRefresh>(), Ok(UniformRefresh::Once));
        assert_eq!("on-change".parse::<UniformRefresh>(), Ok(UniformRefresh::OnChange));
        assert!("always".parse::<UniformRefresh>().is_err());
    }
}
