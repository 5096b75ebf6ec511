//! ImageMagick backend.
//!
//! Shells out to `magick` (ImageMagick 7) or the legacy `identify`/`convert`
//! pair (ImageMagick 6). Every invocation runs under a deadline: a process
//! still alive when it expires is killed and reported as
//! [`ProcessorError::Timeout`], so one pathological file cannot stall a build.

use super::backend::{Dimensions, EncodedImage, ImageProcessor, ProcessorError};
use super::params::PlaceholderParams;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// ImageMagick subprocess backend.
#[derive(Debug, Clone)]
pub struct MagickProcessor {
    identify: Vec<String>,
    convert: Vec<String>,
    timeout: Duration,
}

impl MagickProcessor {
    /// Probe `PATH` for ImageMagick. Prefers the v7 `magick` entry point.
    pub fn detect(timeout: Duration) -> Option<Self> {
        if tool_available("magick") {
            return Some(Self {
                identify: vec!["magick".into(), "identify".into()],
                convert: vec!["magick".into()],
                timeout,
            });
        }
        if tool_available("convert") && tool_available("identify") {
            return Some(Self {
                identify: vec!["identify".into()],
                convert: vec!["convert".into()],
                timeout,
            });
        }
        None
    }

    fn command(&self, argv: &[String]) -> Command {
        let mut cmd = Command::new(&argv[0]);
        cmd.args(&argv[1..]);
        cmd
    }
}

fn tool_available(tool: &str) -> bool {
    Command::new(tool)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Input path selecting the first frame, e.g. `photo.gif[0]`.
fn first_frame(path: &Path) -> String {
    format!("{}[0]", path.display())
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

/// Run `cmd` to completion, killing it if it outlives `timeout`.
///
/// Returns stdout on a zero exit status. Stdout and stderr are drained on
/// their own threads so a chatty child cannot block on a full pipe.
pub fn run_with_deadline(
    mut cmd: Command,
    tool: &str,
    timeout: Duration,
) -> Result<Vec<u8>, ProcessorError> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let started = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if started.elapsed() >= timeout {
            debug!(tool, ?timeout, "killing child past deadline");
            let _ = child.kill();
            let _ = child.wait();
            return Err(ProcessorError::Timeout {
                tool: tool.to_string(),
                after: timeout,
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    let out = stdout.join().unwrap_or_default();
    let err = stderr.join().unwrap_or_default();

    if status.success() {
        Ok(out)
    } else {
        Err(ProcessorError::ProcessingFailed(format!(
            "{} exited with {}: {}",
            tool,
            status,
            String::from_utf8_lossy(&err).trim()
        )))
    }
}

fn parse_dimensions(output: &[u8]) -> Result<Dimensions, ProcessorError> {
    let text = String::from_utf8_lossy(output);
    let mut parts = text.split_whitespace().map(str::parse::<u32>);
    match (parts.next(), parts.next()) {
        (Some(Ok(width)), Some(Ok(height))) => Ok(Dimensions { width, height }),
        _ => Err(ProcessorError::ProcessingFailed(format!(
            "Unexpected identify output: {}",
            text.trim()
        ))),
    }
}

impl ImageProcessor for MagickProcessor {
    fn identify(&self, path: &Path) -> Result<Dimensions, ProcessorError> {
        let mut cmd = self.command(&self.identify);
        cmd.args(["-format", "%w %h"]).arg(first_frame(path));
        let out = run_with_deadline(cmd, &self.identify[0], self.timeout)?;
        parse_dimensions(&out)
    }

    fn placeholder(
        &self,
        path: &Path,
        params: &PlaceholderParams,
    ) -> Result<EncodedImage, ProcessorError> {
        let mut cmd = self.command(&self.convert);
        cmd.arg(first_frame(path))
            .arg("-resize")
            .arg(format!("{}x{}!", params.width, params.height));
        let sigma = params.raster_sigma();
        if sigma > 0.0 {
            cmd.arg("-blur").arg(format!("0x{sigma}"));
        }
        cmd.arg("-strip").arg("png:-");

        let bytes = run_with_deadline(cmd, &self.convert[0], self.timeout)?;
        if bytes.is_empty() {
            return Err(ProcessorError::ProcessingFailed(format!(
                "{} produced no output for {}",
                self.convert[0],
                path.display()
            )));
        }
        Ok(EncodedImage {
            mime: "image/png".to_string(),
            bytes,
        })
    }
}
