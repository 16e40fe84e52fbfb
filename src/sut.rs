//! Spawns the SUT as a child process and reads bounded chunks from its stdout.

use std::path::Path;
use std::process::Stdio;

use report_codec::PacketLayout;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout};

use snafu::ResultExt;

use crate::errors::{ReporterError, SutSpawnSnafu};

/// An instrumented SUT running as a child process, with its stdout piped.
pub struct SutProcess {
    child: Child,
    stdout: ChildStdout,
    layout: PacketLayout,
}

impl SutProcess {
    /// Spawn `sut_path` with stdout piped; stdin/stderr are inherited so the
    /// SUT's own diagnostics remain visible, matching `subprocess.Popen`'s
    /// default of only redirecting stdout.
    pub async fn spawn(sut_path: &Path, layout: PacketLayout) -> Result<Self, ReporterError> {
        let mut child = tokio::process::Command::new(sut_path)
            .stdout(Stdio::piped())
            .spawn()
            .context(SutSpawnSnafu {
                path: sut_path.to_path_buf(),
            })?;

        let stdout = child
            .stdout
            .take()
            .expect("stdout was configured as piped");

        Ok(Self {
            child,
            stdout,
            layout,
        })
    }

    /// Read up to one full batch (`capacity * max_pkg_size` bytes). Returns an
    /// empty vector only at EOF.
    pub async fn read_batch(&mut self) -> Result<Vec<u8>, std::io::Error> {
        let want = self.layout.capacity() * self.layout.max_pkg_size();
        let mut buf = vec![0u8; want];
        let n = self.stdout.read(&mut buf).await?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Close the pipe and terminate the child. Idempotent and safe after EOF.
    pub async fn stop(mut self) {
        drop(self.stdout);
        if let Err(e) = self.child.start_kill() {
            if e.kind() != std::io::ErrorKind::InvalidInput {
                tracing::warn!(error = %e, "failed to terminate SUT child process");
            }
        }
        let _ = self.child.wait().await;
    }
}
