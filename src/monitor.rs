// src/monitor.rs
//! Main loop: configure the module, read, parse, redraw

use crate::{
    config::GpsConfig,
    display::FixDisplay,
    error::{GpsError, Result},
    gps::{
        nmea::Sentence,
        reader::{send_command, ReadEvent, SentenceReader},
        Fix, PmtkCommand,
    },
    schedule::RefreshSchedule,
};
use std::time::Duration;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    time::timeout,
};

/// Quiet time on the line that ends a read burst
pub const DEFAULT_READ_WINDOW: Duration = Duration::from_millis(50);

/// How long the module gets to acknowledge a rate change
pub const ACK_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on sentences taken in one cycle, in case the line never idles
const MAX_SENTENCES_PER_CYCLE: usize = 64;

#[derive(Debug, Clone)]
pub struct MonitorOptions {
    pub update_rate: Duration,
    pub read_window: Duration,
    pub pps: bool,
    pub periodic: Option<Duration>,
    pub cold_boot: bool,
    pub refresh_interval: u32,
    pub idle_polls: u32,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self::from(&GpsConfig::default())
    }
}

impl From<&GpsConfig> for MonitorOptions {
    fn from(config: &GpsConfig) -> Self {
        Self {
            update_rate: config.update_rate(),
            read_window: DEFAULT_READ_WINDOW,
            pps: config.pps,
            periodic: config.periodic(),
            cold_boot: false,
            refresh_interval: config.refresh_interval_secs,
            idle_polls: config.idle_polls,
        }
    }
}

/// Result of one read burst
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleOutcome {
    pub accepted: usize,
    pub rejected: usize,
    pub end_of_stream: bool,
}

/// Owns the link to the module and the single in-flight fix
pub struct GpsMonitor<R, W> {
    reader: SentenceReader<R>,
    writer: W,
    fix: Fix,
    schedule: RefreshSchedule,
    options: MonitorOptions,
}

impl<R, W> GpsMonitor<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W, options: MonitorOptions) -> Self {
        Self {
            reader: SentenceReader::new(reader),
            writer,
            fix: Fix::new(),
            schedule: RefreshSchedule::new(options.refresh_interval, options.idle_polls),
            options,
        }
    }

    /// The current fix
    pub fn fix(&self) -> &Fix {
        &self.fix
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    /// Put the module into the state the badge expects
    pub async fn configure(&mut self) -> Result<()> {
        if self.options.cold_boot {
            log::warn!("Cold booting GPS, the first fix will take a few minutes");
            send_command(&mut self.writer, &PmtkCommand::ColdBoot).await?;
        }

        send_command(&mut self.writer, &PmtkCommand::NormalMode).await?;
        send_command(&mut self.writer, &PmtkCommand::OutputGgaRmc).await?;

        match self.options.periodic {
            Some(period) => {
                // The module only takes the periodic settings after a 1 s rate
                let rate = PmtkCommand::SetUpdateRate(Duration::from_secs(1));
                send_command(&mut self.writer, &rate).await?;
                self.wait_for_ack(rate.packet_type(), ACK_TIMEOUT).await?;
                send_command(&mut self.writer, &PmtkCommand::PeriodicMode(period)).await?;
                log::info!("GPS in periodic mode, waking every {:?}", period);
            }
            None => {
                send_command(&mut self.writer, &PmtkCommand::SetUpdateRate(self.options.update_rate)).await?;
            }
        }

        send_command(&mut self.writer, &PmtkCommand::SetPps(self.options.pps)).await?;
        Ok(())
    }

    /// Read until the module acknowledges `packet_type`
    async fn wait_for_ack(&mut self, packet_type: u16, limit: Duration) -> Result<()> {
        let wait = async {
            loop {
                let line = match self.reader.next_sentence().await {
                    Ok(Some(line)) => line,
                    Ok(None) => return Err(GpsError::Connection("GPS stream closed".to_string())),
                    Err(e) => return Err(e),
                };
                if let Some(Sentence::Ack(ack)) = self.handle_line(&line) {
                    if ack.command == packet_type {
                        if !ack.is_success() {
                            log::warn!("GPS answered PMTK{} with flag {}", packet_type, ack.flag);
                        }
                        return Ok(());
                    }
                }
            }
        };

        timeout(limit, wait)
            .await
            .map_err(|_| GpsError::Timeout(format!("no acknowledgement for PMTK{}", packet_type)))?
    }

    /// Drain whatever the module has sent until the line goes quiet
    pub async fn poll_cycle(&mut self) -> Result<CycleOutcome> {
        let mut outcome = CycleOutcome::default();

        while outcome.accepted + outcome.rejected < MAX_SENTENCES_PER_CYCLE {
            match self.reader.next_sentence_within(self.options.read_window).await? {
                ReadEvent::Sentence(line) => match self.handle_line(&line) {
                    Some(_) => outcome.accepted += 1,
                    None => outcome.rejected += 1,
                },
                ReadEvent::Idle => break,
                ReadEvent::Closed => {
                    outcome.end_of_stream = true;
                    break;
                }
            }
        }

        Ok(outcome)
    }

    /// Apply one line to the fix; bad sentences are dropped
    fn handle_line(&mut self, line: &str) -> Option<Sentence> {
        match self.fix.update_from_line(line) {
            Ok(sentence) => Some(sentence),
            Err(e) => {
                log::debug!("Dropping {:?}: {}", line, e);
                None
            }
        }
    }

    /// Run until the stream ends
    pub async fn run(&mut self, display: &mut dyn FixDisplay) -> Result<()> {
        loop {
            let outcome = self.poll_cycle().await?;
            if outcome.rejected > 0 {
                log::debug!("{} sentences dropped this cycle", outcome.rejected);
            }

            let was_tracking = self.schedule.is_tracking();
            let drawn = self.schedule.poll(&self.fix);
            if drawn {
                if !was_tracking && self.schedule.is_tracking() {
                    log::info!("GPS fix acquired");
                }
                if let Err(e) = display.show(&self.fix) {
                    log::warn!("Failed to draw fix: {}", e);
                }
            }

            if outcome.end_of_stream {
                log::info!("GPS stream closed");
                return Ok(());
            }

            // A panel refresh while tracking takes about as long as one update
            if !(drawn && self.schedule.is_tracking()) {
                tokio::time::sleep(self.options.update_rate).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RMC: &[u8] = b"$GNRMC,094530.000,A,5606.1725,N,01404.0622,E,0.17,289.56,120721,,,A*79\r\n";
    const GGA: &[u8] = b"$GNGGA,094530.000,5606.1725,N,01404.0622,E,1,07,1.10,58.3,M,39.2,M,,*4B\r\n";
    const BAD: &[u8] = b"$GNRMC,094530.000,A,5606.1725,N,01404.0622,E,0.17,289.56,120721,,,A*78\r\n";

    fn options() -> MonitorOptions {
        MonitorOptions {
            update_rate: Duration::from_millis(1),
            read_window: Duration::from_millis(20),
            ..MonitorOptions::default()
        }
    }

    #[derive(Default)]
    struct Recorder {
        shown: Vec<Fix>,
    }

    impl FixDisplay for Recorder {
        fn show(&mut self, fix: &Fix) -> Result<()> {
            self.shown.push(fix.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_configure_sends_commands() {
        let mut monitor = GpsMonitor::new(&b""[..], Vec::new(), options());
        monitor.configure().await.unwrap();

        let sent = String::from_utf8(monitor.into_writer()).unwrap();
        assert_eq!(
            sent,
            "$PMTK225,0*2B\r\n\
             $PMTK314,0,1,0,3,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0*36\r\n\
             $PMTK220,1000,0,0,0,0*1F\r\n\
             $PMTK285,0,100*3C\r\n"
        );
    }

    #[tokio::test]
    async fn test_periodic_mode_waits_for_ack() {
        let input = [RMC, &b"$PMTK001,220,3*30\r\n"[..]].concat();
        let mut opts = options();
        opts.periodic = Some(Duration::from_secs(30));

        let mut monitor = GpsMonitor::new(&input[..], Vec::new(), opts);
        monitor.configure().await.unwrap();
        // Sentences seen while waiting still update the fix
        assert!(monitor.fix().valid);

        let sent = String::from_utf8(monitor.into_writer()).unwrap();
        assert!(sent.contains("$PMTK220,1000,0,0,0,0*1F\r\n$PMTK225,2,7000,23000,30000,23000*1D\r\n"));
    }

    #[tokio::test]
    async fn test_periodic_mode_without_ack_fails() {
        let mut opts = options();
        opts.periodic = Some(Duration::from_secs(30));

        let mut monitor = GpsMonitor::new(RMC, Vec::new(), opts);
        let err = monitor.configure().await.unwrap_err();
        assert!(matches!(err, GpsError::Connection(_)));
    }

    #[tokio::test]
    async fn test_poll_cycle_counts_sentences() {
        let input = [RMC, BAD, &b"noise\r\n"[..], GGA].concat();
        let mut monitor = GpsMonitor::new(&input[..], Vec::new(), options());

        let outcome = monitor.poll_cycle().await.unwrap();
        assert_eq!(
            outcome,
            CycleOutcome {
                accepted: 2,
                rejected: 1,
                end_of_stream: true
            }
        );
        assert!(monitor.fix().valid);
        assert_eq!(monitor.fix().satellites, Some(7));
    }

    #[tokio::test]
    async fn test_bad_sentence_keeps_previous_fix() {
        let input = [RMC, BAD].concat();
        let mut monitor = GpsMonitor::new(&input[..], Vec::new(), options());

        monitor.poll_cycle().await.unwrap();
        let mut expected = Fix::new();
        expected.update_from_line(std::str::from_utf8(RMC).unwrap()).unwrap();
        assert_eq!(monitor.fix(), &expected);
    }

    #[tokio::test]
    async fn test_poll_cycle_stops_when_idle() {
        let (client, mut server) = tokio::io::duplex(256);
        let mut monitor = GpsMonitor::new(client, Vec::new(), options());

        tokio::io::AsyncWriteExt::write_all(&mut server, RMC).await.unwrap();
        let outcome = monitor.poll_cycle().await.unwrap();

        assert_eq!(outcome.accepted, 1);
        assert!(!outcome.end_of_stream);
    }

    #[tokio::test]
    async fn test_poll_cycle_waits_for_slow_sentence() {
        let (client, mut server) = tokio::io::duplex(256);
        let feeder = tokio::spawn(async move {
            for &byte in RMC {
                tokio::io::AsyncWriteExt::write_all(&mut server, &[byte]).await.unwrap();
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
            server
        });

        let opts = MonitorOptions {
            read_window: DEFAULT_READ_WINDOW,
            ..options()
        };
        let mut monitor = GpsMonitor::new(client, Vec::new(), opts);
        let outcome = monitor.poll_cycle().await.unwrap();

        assert_eq!(outcome.accepted, 1);
        assert!(!outcome.end_of_stream);
        assert!(monitor.fix().valid);
        drop(feeder.await.unwrap());
    }

    #[tokio::test]
    async fn test_run_draws_and_ends_with_stream() {
        let mut monitor = GpsMonitor::new(RMC, Vec::new(), options());
        let mut recorder = Recorder::default();

        monitor.run(&mut recorder).await.unwrap();

        assert_eq!(recorder.shown.len(), 1);
        assert!(recorder.shown[0].valid);
    }

    /// Hangs up the link on the first draw
    struct HangUpOnDraw {
        link: Option<tokio::io::DuplexStream>,
    }

    impl FixDisplay for HangUpOnDraw {
        fn show(&mut self, _fix: &Fix) -> Result<()> {
            self.link.take();
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_run_skips_sleep_after_tracking_draw() {
        let (client, mut server) = tokio::io::duplex(256);
        tokio::io::AsyncWriteExt::write_all(&mut server, RMC).await.unwrap();

        let opts = MonitorOptions {
            update_rate: Duration::from_secs(60),
            ..options()
        };
        let mut monitor = GpsMonitor::new(client, Vec::new(), opts);
        let mut display = HangUpOnDraw { link: Some(server) };

        timeout(Duration::from_secs(5), monitor.run(&mut display))
            .await
            .expect("run slept after drawing")
            .unwrap();
        assert!(display.link.is_none());
    }

    #[tokio::test]
    async fn test_run_without_fix_draws_invalid_screen() {
        let mut monitor = GpsMonitor::new(&b"$GNRMC,094530.000,V,,,,,,,120721,,,N*5F\r\n"[..], Vec::new(), options());
        let mut recorder = Recorder::default();

        monitor.run(&mut recorder).await.unwrap();

        assert_eq!(recorder.shown.len(), 1);
        assert!(!recorder.shown[0].valid);
    }
}
