use std::time::Instant;

use super::models::MemoryUsage;

/// Process start reference for uptime reporting
#[derive(Debug, Clone, Copy)]
pub struct Uptime {
    started_at: Instant,
}

impl Uptime {
    pub fn start() -> Self {
        Self {
            started_at: Instant::now(),
        }
    }

    pub fn seconds(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}

/// Resident and virtual memory of this process, from /proc on Linux
pub fn memory_usage() -> Option<MemoryUsage> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    parse_proc_status(&status)
}

fn parse_proc_status(status: &str) -> Option<MemoryUsage> {
    let field = |name: &str| -> Option<u64> {
        let line = status.lines().find(|line| line.starts_with(name))?;
        let kb: u64 = line[name.len()..].split_whitespace().next()?.parse().ok()?;
        Some(kb * 1024)
    };

    Some(MemoryUsage {
        rss: field("VmRSS:")?,
        virtual_size: field("VmSize:")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_proc_status() {
        let status = "Name:\tprice-tracker\nVmSize:\t  204800 kB\nVmRSS:\t   10240 kB\n";
        let usage = parse_proc_status(status).unwrap();
        assert_eq!(usage.rss, 10240 * 1024);
        assert_eq!(usage.virtual_size, 204800 * 1024);
    }

    #[test]
    fn test_parse_missing_fields() {
        assert!(parse_proc_status("Name:\tx\n").is_none());
    }

    #[test]
    fn test_uptime_is_monotonic() {
        let uptime = Uptime::start();
        assert!(uptime.seconds() >= 0.0);
    }
}
