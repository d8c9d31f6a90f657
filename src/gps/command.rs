// src/gps/command.rs
//! PMTK configuration commands for MediaTek receivers (PA1010D and friends)

use std::time::Duration;

use super::nmea;

/// Acquisition window the module gets in periodic mode before sleeping
const SHORT_ACQUISITION_MS: u64 = 7_000;
const LONG_ACQUISITION_MS: u64 = 30_000;

/// Commands understood by the module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PmtkCommand {
    /// Position fix interval, clamped to 1..=10 seconds
    SetUpdateRate(Duration),
    /// Pulse-per-second output; off also stops the green LED flashing
    SetPps(bool),
    /// Sleep between fixes, clamped to 15..=300 seconds
    PeriodicMode(Duration),
    NormalMode,
    /// Forget ephemeris and almanac, the next fix takes minutes
    ColdBoot,
    /// Only emit RMC (every fix) and GGA (every third fix)
    OutputGgaRmc,
}

impl PmtkCommand {
    /// Packet type the module echoes back in `$PMTK001`
    pub fn packet_type(&self) -> u16 {
        match self {
            PmtkCommand::SetUpdateRate(_) => 220,
            PmtkCommand::SetPps(_) => 285,
            PmtkCommand::PeriodicMode(_) | PmtkCommand::NormalMode => 225,
            PmtkCommand::ColdBoot => 103,
            PmtkCommand::OutputGgaRmc => 314,
        }
    }

    /// Text between `$` and `*`
    pub fn body(&self) -> String {
        match self {
            PmtkCommand::SetUpdateRate(interval) => {
                let ms = (interval.as_millis() as u64).clamp(1_000, 10_000);
                format!("PMTK220,{},0,0,0,0", ms)
            }
            PmtkCommand::SetPps(true) => "PMTK285,2,100".to_string(),
            PmtkCommand::SetPps(false) => "PMTK285,0,100".to_string(),
            PmtkCommand::PeriodicMode(period) => {
                let ms = (period.as_secs_f64().clamp(15.0, 300.0) * 1000.0) as u64;
                let sleep = ms - SHORT_ACQUISITION_MS;
                format!(
                    "PMTK225,2,{},{},{},{}",
                    SHORT_ACQUISITION_MS, sleep, LONG_ACQUISITION_MS, sleep
                )
            }
            PmtkCommand::NormalMode => "PMTK225,0".to_string(),
            PmtkCommand::ColdBoot => "PMTK103".to_string(),
            PmtkCommand::OutputGgaRmc => {
                "PMTK314,0,1,0,3,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0".to_string()
            }
        }
    }

    /// Full wire form including checksum and line ending
    pub fn encode(&self) -> String {
        format!("{}\r\n", nmea::frame(&self.body()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_rate() {
        let cmd = PmtkCommand::SetUpdateRate(Duration::from_secs(5));
        assert_eq!(cmd.encode(), "$PMTK220,5000,0,0,0,0*1B\r\n");
        assert_eq!(cmd.packet_type(), 220);
    }

    #[test]
    fn test_update_rate_clamped() {
        assert_eq!(
            PmtkCommand::SetUpdateRate(Duration::from_millis(100)).encode(),
            "$PMTK220,1000,0,0,0,0*1F\r\n"
        );
        assert_eq!(
            PmtkCommand::SetUpdateRate(Duration::from_secs(60)).encode(),
            "$PMTK220,10000,0,0,0,0*2F\r\n"
        );
    }

    #[test]
    fn test_pps() {
        assert_eq!(PmtkCommand::SetPps(false).encode(), "$PMTK285,0,100*3C\r\n");
        assert_eq!(PmtkCommand::SetPps(true).encode(), "$PMTK285,2,100*3E\r\n");
    }

    #[test]
    fn test_power_modes() {
        assert_eq!(PmtkCommand::NormalMode.encode(), "$PMTK225,0*2B\r\n");
        assert_eq!(
            PmtkCommand::PeriodicMode(Duration::from_secs(30)).encode(),
            "$PMTK225,2,7000,23000,30000,23000*1D\r\n"
        );
        // Below the minimum period the module is given 15 s
        assert_eq!(
            PmtkCommand::PeriodicMode(Duration::from_secs(1)).body(),
            "PMTK225,2,7000,8000,30000,8000"
        );
        assert_eq!(
            PmtkCommand::PeriodicMode(Duration::from_secs(3600)).body(),
            "PMTK225,2,7000,293000,30000,293000"
        );
    }

    #[test]
    fn test_fixed_commands() {
        assert_eq!(PmtkCommand::ColdBoot.encode(), "$PMTK103*30\r\n");
        assert_eq!(
            PmtkCommand::OutputGgaRmc.encode(),
            "$PMTK314,0,1,0,3,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0*36\r\n"
        );
    }
}
