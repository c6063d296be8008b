use std::{io, path::Path, process::Stdio};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process::Command,
    sync::oneshot,
    task::JoinHandle
};
use tracing::{debug, info};

use crate::events::{Events, LaunchEvent, LaunchState};

pub struct LaunchCommand {
    cmd: Command,
    args: Vec<String>
}

impl LaunchCommand {
    pub fn new(java_path: &Path, launch_dir: &Path, detached: bool) -> Self {
        let mut cmd = Command::new(java_path);

        // set current directory for log output
        cmd.current_dir(launch_dir);

        if detached {
            // own process group so the game outlives a ctrl-c of the launcher
            #[cfg(unix)]
            cmd.process_group(0);

            #[cfg(windows)]
            cmd.creation_flags(0x00000008);
        }

        Self {
            cmd,
            args: Vec::new()
        }
    }

    pub fn arg<S: Into<String>>(&mut self, val: S) -> &mut Self {
        self.args.push(val.into());
        self
    }

    pub fn args<I>(&mut self, iter: I) -> &mut Self
        where I: IntoIterator, I::Item: Into<String>
    {
        iter.into_iter().for_each(|v| self.args.push(v.into()));
        self
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Start the game, its output and exit code are reported on `events`
    pub fn spawn(mut self, events: Events) -> io::Result<GameProcess> {
        debug!("Launching with args {:?}", self.args);

        let mut child = self.cmd
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let id = child.id();
        info!("Game started with pid {id:?}");

        let stdout = child.stdout.take().map(|out| forward_lines(out, events.clone()));
        let stderr = child.stderr.take().map(|err| forward_lines(err, events.clone()));

        let (kill_tx, kill_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let status = tokio::select! {
                status = child.wait() => Some(status),
                Ok(()) = kill_rx => None
            };

            let status = match status {
                Some(status) => status,
                None => {
                    info!("Killing game process");
                    let _ = child.kill().await;
                    child.wait().await
                }
            };

            for reader in [stdout, stderr].into_iter().flatten() {
                let _ = reader.await;
            }

            let code = status.ok().and_then(|s| s.code());
            info!("Game exited with code {code:?}");

            events.emit(LaunchEvent::Close(code));
            events.state(LaunchState::Closed);

            code
        });

        Ok(GameProcess {
            id,
            kill_tx: Some(kill_tx),
            handle
        })
    }
}

fn forward_lines<R>(reader: R, events: Events) -> JoinHandle<()>
    where R: AsyncRead + Unpin + Send + 'static
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();

        while let Ok(Some(line)) = lines.next_line().await {
            events.emit(LaunchEvent::Data(line));
        }
    })
}

/// Handle to a running game
pub struct GameProcess {
    id: Option<u32>,
    kill_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Option<i32>>
}

impl GameProcess {
    pub fn id(&self) -> Option<u32> {
        self.id
    }

    pub fn kill(&mut self) {
        if let Some(tx) = self.kill_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Wait for the game to exit, returning its exit code
    pub async fn wait(self) -> anyhow::Result<Option<i32>> {
        Ok(self.handle.await?)
    }
}
