//! Opens ad links in the desktop's default browser.

use chit_ads_core::presentation::LinkOpener;

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

/// Ad links come from merchants. Only plain `http(s)` URLs without
/// whitespace or control characters are handed to the OS.
fn check_link(url: &str) -> Result<(), &'static str> {
  let lower = url.to_ascii_lowercase();
  if !(lower.starts_with("https://") || lower.starts_with("http://")) {
    return Err("only http and https links are opened");
  }
  if url.chars().any(|c| c.is_whitespace() || c.is_control()) {
    return Err("link contains whitespace or control characters");
  }
  Ok(())
}

impl SystemBrowser {
  fn command(url: &str) -> tokio::process::Command {
    if cfg!(target_os = "macos") {
      let mut cmd = tokio::process::Command::new("open");
      cmd.arg(url);
      cmd
    } else if cfg!(target_os = "windows") {
      // No shell in between, so `&` and friends stay part of the URL.
      let mut cmd = tokio::process::Command::new("rundll32");
      cmd.args(["url.dll,FileProtocolHandler", url]);
      cmd
    } else {
      let mut cmd = tokio::process::Command::new("xdg-open");
      cmd.arg(url);
      cmd
    }
  }
}

impl LinkOpener for SystemBrowser {
  /// Launches the opener without waiting for it.
  fn open(&self, url: &str) -> chit_ads_core::Result<()> {
    let link_error = |source: Box<dyn std::error::Error + Send + Sync>| {
      chit_ads_core::Error::Link {
        url: url.to_owned(),
        source,
      }
    };
    check_link(url).map_err(|reason| link_error(reason.into()))?;
    Self::command(url)
      .stdin(std::process::Stdio::null())
      .stdout(std::process::Stdio::null())
      .stderr(std::process::Stdio::null())
      .spawn()
      .map(drop)
      .map_err(|e| link_error(Box::new(e)))
  }
}
