use serde::{Deserialize, Serialize};

/// Arguments of one `httpx` tool call.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct ScanRequest {
    /// Hosts or domains to probe. Older clients send this as `target`.
    #[serde(alias = "target")]
    pub targets: Vec<String>,
    #[serde(default)]
    pub ports: Option<Vec<u16>>,
    #[serde(default)]
    pub probes: Option<Vec<String>>,
}

impl ScanRequest {
    pub fn new<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            targets: targets.into_iter().map(Into::into).collect(),
            ports: None,
            probes: None,
        }
    }

    pub fn with_ports(mut self, ports: impl Into<Vec<u16>>) -> Self {
        self.ports = Some(ports.into());
        self
    }

    pub fn with_probes<I, S>(mut self, probes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.probes = Some(probes.into_iter().map(Into::into).collect());
        self
    }
}

/// Raw outcome of one child process, before classification.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessOutput {
    /// `None` when the child ended without a conventional exit status.
    pub exit_code: Option<i32>,
    /// Terminating signal, unix only.
    pub signal: Option<i32>,
    pub stdout: Captured,
    pub stderr: Captured,
}

/// Bytes kept from one stream, plus how many the stream produced in total.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Captured {
    pub bytes: Vec<u8>,
    pub total: u64,
}

impl Captured {
    pub fn truncated(&self) -> bool {
        self.total > self.bytes.len() as u64
    }

    pub fn to_text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    /// Kept bytes up to and including the last newline. A capped stream can end
    /// mid-line, mid-escape or mid-character; the partial line is dropped.
    pub fn complete_lines(&self) -> &[u8] {
        match self.bytes.iter().rposition(|&b| b == b'\n') {
            Some(pos) => &self.bytes[..=pos],
            None => &[],
        }
    }
}

/// Text payload handed back to the caller.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ToolResponse {
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_lines_backs_off_to_newline() {
        let captured = Captured {
            bytes: b"one\ntwo\nthr".to_vec(),
            total: 40,
        };
        assert_eq!(captured.complete_lines(), b"one\ntwo\n");

        let captured = Captured {
            bytes: b"abc\x1b[3".to_vec(),
            total: 17,
        };
        assert!(captured.complete_lines().is_empty());
    }

    #[test]
    fn unknown_request_fields_rejected() {
        let res = serde_json::from_str::<ScanRequest>(r#"{"targets":["a"],"output":"/tmp/x"}"#);
        assert!(res.is_err());
    }
}
