use std::path::Path;

use chainplace_core::PlacementConfig;

pub fn init(path: &str, delay: Option<&str>) -> anyhow::Result<()> {
    let output = Path::new(path).join("chainplace.toml");
    if output.exists() {
        anyhow::bail!("{} already exists", output.display());
    }
    std::fs::write(&output, PlacementConfig::scaffold(delay).to_toml_string()?)?;
    println!("✓ Generated {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaffold_parses_back() {
        let dir = tempfile::tempdir().unwrap();
        init(&dir.path().display().to_string(), Some("max_delay.txt")).unwrap();
        let config = PlacementConfig::from_file(&dir.path().join("chainplace.toml")).unwrap();
        assert_eq!(config.inputs.delay, Some(dir.path().join("max_delay.txt")));
        assert_eq!(config.engine.reserved_cores, 2);
    }

    #[test]
    fn refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().display().to_string();
        init(&path, None).unwrap();
        assert!(init(&path, None).is_err());
    }
}
