use std::path::Path;

use vmjudge_core::JudgeConfig;

pub fn init(path: &str) -> anyhow::Result<()> {
    let output = Path::new(path).join("vmjudge.toml");
    if output.exists() {
        anyhow::bail!("{} already exists", output.display());
    }

    std::fs::write(&output, JudgeConfig::scaffold().to_toml_string()?)?;
    println!("✓ Generated {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        init(dir.path().to_str().unwrap()).unwrap();

        let config = JudgeConfig::from_file(&dir.path().join("vmjudge.toml")).unwrap();
        assert_eq!(
            config.response_timeout().unwrap(),
            vmjudge_core::config::DEFAULT_RESPONSE_TIMEOUT
        );
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("vmjudge.toml"), "# mine\n").unwrap();

        assert!(init(dir.path().to_str().unwrap()).is_err());
        let kept = std::fs::read_to_string(dir.path().join("vmjudge.toml")).unwrap();
        assert_eq!(kept, "# mine\n");
    }
}
