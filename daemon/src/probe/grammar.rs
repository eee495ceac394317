use super::ProbeGrammar;
use crate::error::LineError;
use std::str::FromStr;

fn require(fields: &[&str], expected: usize) -> Result<(), LineError> {
    if fields.len() < expected {
        return Err(LineError::TooFewFields {
            expected,
            got: fields.len(),
        });
    }
    Ok(())
}

fn number<T: FromStr>(fields: &[&str], index: usize) -> Result<T, LineError> {
    let raw = fields.get(index).copied().unwrap_or_default();
    raw.parse().map_err(|_| LineError::BadNumber {
        index,
        value: raw.to_string(),
    })
}

fn percent(fields: &[&str], index: usize) -> Result<f64, LineError> {
    let value: f64 = number(fields, index)?;
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(LineError::BadNumber {
            index,
            value: fields[index].to_string(),
        });
    }
    Ok(value)
}

fn add(total: u64, value: u64, index: usize) -> Result<u64, LineError> {
    total.checked_add(value).ok_or(LineError::Overflow { index })
}

/// Page-cache hits: `TIME HITS MISSES DIRTIES ...`, hits summed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStat {
    pub total_hits: u64,
}

impl ProbeGrammar for CacheStat {
    const NAME: &'static str = "cachestat";
    const HEADER_TOKENS: &'static [&'static str] = &["TIME", "HITS"];

    fn fold(&mut self, fields: &[&str]) -> Result<(), LineError> {
        require(fields, 4)?;
        let hits: u64 = number(fields, 1)?;
        self.total_hits = add(self.total_hits, hits, 1)?;
        Ok(())
    }
}

/// Block I/O pattern: `TIME DISK %RND %SEQ COUNT KBYTES` per interval.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BioPattern {
    pub random_percent_sum: f64,
    pub sequential_percent_sum: f64,
    pub total_count: u64,
    pub total_kbytes: u64,
    pub intervals: u64,
}

impl BioPattern {
    pub fn avg_random_percent(&self) -> f64 {
        if self.intervals == 0 {
            return 0.0;
        }
        self.random_percent_sum / self.intervals as f64
    }

    pub fn avg_sequential_percent(&self) -> f64 {
        if self.intervals == 0 {
            return 0.0;
        }
        self.sequential_percent_sum / self.intervals as f64
    }
}

impl ProbeGrammar for BioPattern {
    const NAME: &'static str = "biopattern";
    const HEADER_TOKENS: &'static [&'static str] = &["TIME"];

    fn fold(&mut self, fields: &[&str]) -> Result<(), LineError> {
        require(fields, 6)?;
        let random = percent(fields, 2)?;
        let sequential = percent(fields, 3)?;
        let count: u64 = number(fields, 4)?;
        let kbytes: u64 = number(fields, 5)?;
        let total_count = add(self.total_count, count, 4)?;
        let total_kbytes = add(self.total_kbytes, kbytes, 5)?;

        self.random_percent_sum += random;
        self.sequential_percent_sum += sequential;
        self.total_count = total_count;
        self.total_kbytes = total_kbytes;
        self.intervals += 1;
        Ok(())
    }
}

/// Socket binds of the target: `PID COMM PROT ADDR PORT ...`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindSnoop {
    pub tcp_binds: u64,
    pub udp_binds: u64,
}

impl ProbeGrammar for BindSnoop {
    const NAME: &'static str = "bindsnoop";
    const HEADER_TOKENS: &'static [&'static str] = &["PID"];

    fn fold(&mut self, fields: &[&str]) -> Result<(), LineError> {
        require(fields, 4)?;
        match fields[2] {
            "TCP" => self.tcp_binds += 1,
            "UDP" => self.udp_binds += 1,
            _ => {}
        }
        Ok(())
    }
}

/// New outbound TCP connections of the target, one per line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TcpConnect {
    pub connections: u64,
}

impl ProbeGrammar for TcpConnect {
    const NAME: &'static str = "tcpconnect";
    const HEADER_TOKENS: &'static [&'static str] = &["PID"];

    fn fold(&mut self, _fields: &[&str]) -> Result<(), LineError> {
        self.connections += 1;
        Ok(())
    }
}
