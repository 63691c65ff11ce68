use std::time::Duration;

use tokio::process::Command;

const DETECT_TIMEOUT: Duration = Duration::from_secs(5);

/// The machine's tailnet IPv4 address, if `tailscale` is installed and up
pub async fn detect_ip() -> Option<String> {
    let output = Command::new("tailscale")
        .args(["ip", "-4"])
        .kill_on_drop(true)
        .output();
    let output = tokio::time::timeout(DETECT_TIMEOUT, output).await.ok()?.ok()?;
    parse_ip_output(&String::from_utf8_lossy(&output.stdout))
}

/// First line of `tailscale ip -4`, accepted only in the 100.x CGNAT range
pub fn parse_ip_output(stdout: &str) -> Option<String> {
    let ip = stdout.lines().next()?.trim();
    ip.starts_with("100.").then(|| ip.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_tailnet_line() {
        assert_eq!(
            parse_ip_output("100.101.5.7\n100.64.0.1\n"),
            Some("100.101.5.7".to_string())
        );
    }

    #[test]
    fn rejects_non_tailnet_output() {
        assert_eq!(parse_ip_output("192.168.1.5\n"), None);
        assert_eq!(parse_ip_output(""), None);
    }
}
