use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn write_stack_kdl(&self, content: &str) {
        let path = self.root.path().join("stack.kdl");
        fs::write(path, content).unwrap();
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    /// `vpcstack` running in the project root, isolated from the caller's
    /// environment and global config
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("vpcstack").unwrap();
        cmd.current_dir(self.path())
            .env_remove("key_pair_file_name")
            .env_remove("VPCSTACK_CONFIG_PATH")
            .env_remove("RUST_LOG")
            .env("XDG_CONFIG_HOME", self.path().join("config-home"))
            .env("NO_COLOR", "1")
            .env("CLICOLOR", "0");
        cmd
    }
}
