// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Typed Gqrx remote-control client.

use tokio::sync::{watch, Mutex};

use gqrx_core::{ConnectionState, GqrxError, GqrxResult};
use gqrx_protocol::{parse_ack, parse_demod, parse_flag, parse_float, parse_int, GqrxCommand};

use crate::connection::{Connection, ConnectionOptions};

/// Client for one Gqrx instance.
///
/// Every operation holds the connection lock for its whole command/reply
/// exchange, so a client can be shared between tasks behind an `Arc`
/// without replies being handed to the wrong caller.
///
/// ```no_run
/// # async fn demo() -> gqrx_core::GqrxResult<()> {
/// let client = gqrx_client::GqrxClient::new("127.0.0.1:7356");
/// client.connect().await?;
/// client.set_demodulator("WFM_ST", 160_000).await?;
/// let hz = client.get_frequency().await?;
/// println!("tuned to {hz} Hz");
/// client.disconnect().await?;
/// # Ok(())
/// # }
/// ```
pub struct GqrxClient {
    conn: Mutex<Connection>,
    state_rx: watch::Receiver<ConnectionState>,
}

impl GqrxClient {
    pub fn new(addr: impl Into<String>) -> Self {
        Self::with_options(addr, ConnectionOptions::default())
    }

    pub fn with_options(addr: impl Into<String>, options: ConnectionOptions) -> Self {
        let conn = Connection::new(addr, options);
        let state_rx = conn.subscribe();
        Self {
            conn: Mutex::new(conn),
            state_rx,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Watch connection state changes, including a reader-side close.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    pub async fn connect(&self) -> GqrxResult<()> {
        self.conn.lock().await.connect().await
    }

    pub async fn disconnect(&self) -> GqrxResult<()> {
        self.conn.lock().await.disconnect().await
    }

    /// Current frequency in Hz.
    pub async fn get_frequency(&self) -> GqrxResult<i64> {
        parse_int(&self.request_line(GqrxCommand::GetFreq).await?)
    }

    pub async fn set_frequency(&self, hz: i64) -> GqrxResult<()> {
        parse_ack(&self.request_line(GqrxCommand::SetFreq(hz)).await?)
    }

    /// Current demodulator mode and its bandwidth in Hz.
    pub async fn get_demodulator(&self) -> GqrxResult<(String, i64)> {
        let mut lines = self.request(GqrxCommand::GetDemod).await?.into_iter();
        match (lines.next(), lines.next()) {
            (Some(mode), Some(bandwidth)) => parse_demod(&mode, &bandwidth),
            _ => Err(GqrxError::protocol(
                "demodulator reply is missing the bandwidth line",
            )),
        }
    }

    /// Set mode and bandwidth. Unknown modes fail before anything is sent.
    pub async fn set_demodulator(&self, mode: &str, bandwidth: i64) -> GqrxResult<()> {
        let cmd = GqrxCommand::set_demod(mode, bandwidth)?;
        parse_ack(&self.request_line(cmd).await?)
    }

    /// Signal strength in dBFS.
    pub async fn get_signal_strength(&self) -> GqrxResult<f64> {
        parse_float(&self.request_line(GqrxCommand::GetSignalStrength).await?)
    }

    /// Squelch threshold in dBFS.
    pub async fn get_squelch(&self) -> GqrxResult<f64> {
        parse_float(&self.request_line(GqrxCommand::GetSquelch).await?)
    }

    pub async fn set_squelch(&self, level: f64) -> GqrxResult<()> {
        parse_ack(&self.request_line(GqrxCommand::SetSquelch(level)).await?)
    }

    pub async fn get_mute(&self) -> GqrxResult<bool> {
        parse_flag(&self.request_line(GqrxCommand::GetMute).await?)
    }

    pub async fn set_mute(&self, muted: bool) -> GqrxResult<()> {
        parse_ack(&self.request_line(GqrxCommand::SetMute(muted)).await?)
    }

    pub async fn get_dsp_running(&self) -> GqrxResult<bool> {
        parse_flag(&self.request_line(GqrxCommand::GetDsp).await?)
    }

    pub async fn set_dsp_running(&self, running: bool) -> GqrxResult<()> {
        parse_ack(&self.request_line(GqrxCommand::SetDsp(running)).await?)
    }

    /// Send an arbitrary command line, byte for byte, and return its reply.
    ///
    /// Multi-line replies (`m`) are joined with `\n`. Commands whose reply
    /// length varies must go through [`GqrxClient::send_raw_lines`].
    pub async fn send_raw(&self, command: &str) -> GqrxResult<String> {
        let lines = self.request(GqrxCommand::raw(command)?).await?;
        Ok(lines.join("\n"))
    }

    /// Send an arbitrary command line and collect exactly `reply_lines`
    /// reply lines.
    pub async fn send_raw_lines(
        &self,
        command: &str,
        reply_lines: usize,
    ) -> GqrxResult<Vec<String>> {
        self.request(GqrxCommand::raw_lines(command, reply_lines)?)
            .await
    }

    async fn request(&self, cmd: GqrxCommand) -> GqrxResult<Vec<String>> {
        self.conn.lock().await.exchange(&cmd).await
    }

    async fn request_line(&self, cmd: GqrxCommand) -> GqrxResult<String> {
        self.request(cmd)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| GqrxError::protocol("missing reply line"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::time::Duration;

    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use gqrx_core::DEMOD_MODES;

    /// Fake receiver: answers each command line with the lines returned by
    /// `respond` and records every line it received. Stops on `Q` or EOF.
    async fn spawn_peer<F>(mut respond: F) -> (String, JoinHandle<Vec<String>>)
    where
        F: FnMut(&str) -> Vec<String> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr").to_string();
        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let (reader, mut writer) = stream.into_split();
            let mut reader = BufReader::new(reader);
            let mut received = Vec::new();
            let mut line = String::new();
            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                }
                let cmd = line.trim_end_matches(['\r', '\n']).to_string();
                received.push(cmd.clone());
                if cmd == "Q" {
                    break;
                }
                for reply in respond(&cmd) {
                    if writer.write_all(format!("{reply}\n").as_bytes()).await.is_err() {
                        return received;
                    }
                }
            }
            received
        });
        (addr, handle)
    }

    /// Minimal stateful stand-in for Gqrx's remote control server.
    fn gqrx_emulator() -> impl FnMut(&str) -> Vec<String> + Send + 'static {
        let mut freq: i64 = 145_500_000;
        let mut demod = ("FM".to_string(), 10_000_i64);
        let mut squelch = -150.0_f64;
        let mut muted = false;
        let mut dsp = true;

        move |cmd: &str| {
            let parts: Vec<&str> = cmd.split_whitespace().collect();
            let reply: Vec<String> = match parts.as_slice() {
                ["f"] => vec![freq.to_string()],
                ["F", hz] => match hz.parse() {
                    Ok(hz) => {
                        freq = hz;
                        vec![freq.to_string()]
                    }
                    Err(_) => vec!["RPRT 1".to_string()],
                },
                ["m"] => vec![demod.0.clone(), demod.1.to_string()],
                ["M", mode, bw] => {
                    demod = (mode.to_string(), bw.parse().unwrap_or(0));
                    vec!["RPRT 0".to_string()]
                }
                ["l", "STRENGTH"] => vec!["-73.4".to_string()],
                ["l", "SQL"] => vec![format!("{squelch:.1}")],
                ["L", "SQL", level] => {
                    squelch = level.parse().unwrap_or(squelch);
                    vec!["RPRT 0".to_string()]
                }
                ["u", "MUTE"] => vec![u8::from(muted).to_string()],
                ["U", "MUTE", v] => {
                    muted = *v == "1";
                    vec!["RPRT 0".to_string()]
                }
                ["u", "DSP"] => vec![u8::from(dsp).to_string()],
                ["U", "DSP", v] => {
                    dsp = *v == "1";
                    vec!["RPRT 0".to_string()]
                }
                _ => vec!["RPRT 1".to_string()],
            };
            reply
        }
    }

    /// Like `spawn_peer(gqrx_emulator())`, but the first reply only goes out
    /// after `delay`.
    async fn spawn_delayed_peer(delay: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr").to_string();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let (reader, mut writer) = stream.into_split();
            let mut reader = BufReader::new(reader);
            let mut respond = gqrx_emulator();
            let mut delay = Some(delay);
            let mut line = String::new();
            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                }
                if let Some(delay) = delay.take() {
                    tokio::time::sleep(delay).await;
                }
                let cmd = line.trim_end_matches(['\r', '\n']);
                for reply in respond(cmd) {
                    if writer.write_all(format!("{reply}\n").as_bytes()).await.is_err() {
                        return;
                    }
                }
            }
        });
        addr
    }

    async fn connected(addr: String) -> GqrxClient {
        let client = GqrxClient::with_options(
            addr,
            ConnectionOptions {
                connect_timeout: Some(Duration::from_secs(2)),
                io_timeout: Some(Duration::from_secs(2)),
            },
        );
        client.connect().await.expect("connect");
        client
    }

    #[tokio::test]
    async fn set_then_get_frequency_round_trips() {
        let (addr, peer) = spawn_peer(gqrx_emulator()).await;
        let client = connected(addr).await;

        client.set_frequency(100_000_000).await.expect("set freq");
        assert_eq!(client.get_frequency().await.expect("get freq"), 100_000_000);

        client.set_frequency(7_074_000).await.expect("set freq");
        assert_eq!(client.get_frequency().await.expect("get freq"), 7_074_000);

        client.disconnect().await.expect("disconnect");
        let received = peer.await.expect("peer");
        assert_eq!(
            received,
            vec!["F 100000000", "f", "F 7074000", "f", "Q"]
        );
    }

    #[tokio::test]
    async fn demodulator_get_and_set() {
        let (addr, peer) = spawn_peer(gqrx_emulator()).await;
        let client = connected(addr).await;

        assert_eq!(
            client.get_demodulator().await.expect("get demod"),
            ("FM".to_string(), 10_000)
        );
        for (i, mode) in DEMOD_MODES.iter().enumerate() {
            let bandwidth = 500 * i as i64;
            client
                .set_demodulator(mode, bandwidth)
                .await
                .expect("set demod");
            assert_eq!(
                client.get_demodulator().await.expect("get demod"),
                (mode.to_string(), bandwidth)
            );
        }

        client.disconnect().await.expect("disconnect");
        let received = peer.await.expect("peer");
        for (i, mode) in DEMOD_MODES.iter().enumerate() {
            let expected = format!("M {} {}", mode, 500 * i);
            assert!(received.contains(&expected), "missing '{expected}'");
        }
    }

    #[tokio::test]
    async fn unknown_mode_is_rejected_without_writing() {
        let (addr, peer) = spawn_peer(gqrx_emulator()).await;
        let client = connected(addr).await;

        for mode in ["NFM", "fm", "", "USB "] {
            let err = client
                .set_demodulator(mode, 10_000)
                .await
                .expect_err("must be rejected");
            assert!(matches!(err, GqrxError::Validation(_)), "{mode}: {err}");
        }

        client.disconnect().await.expect("disconnect");
        assert_eq!(peer.await.expect("peer"), vec!["Q"]);
    }

    #[tokio::test]
    async fn levels_and_flags() {
        let (addr, peer) = spawn_peer(gqrx_emulator()).await;
        let client = connected(addr).await;

        assert_eq!(client.get_signal_strength().await.expect("strength"), -73.4);
        client.set_squelch(-60.5).await.expect("set sql");
        assert_eq!(client.get_squelch().await.expect("get sql"), -60.5);

        assert!(!client.get_mute().await.expect("get mute"));
        client.set_mute(true).await.expect("set mute");
        assert!(client.get_mute().await.expect("get mute"));

        assert!(client.get_dsp_running().await.expect("get dsp"));
        client.set_dsp_running(false).await.expect("set dsp");
        assert!(!client.get_dsp_running().await.expect("get dsp"));

        client.disconnect().await.expect("disconnect");
        let received = peer.await.expect("peer");
        assert!(received.contains(&"L SQL -60.50".to_string()));
        assert!(received.contains(&"U MUTE 1".to_string()));
        assert!(received.contains(&"U DSP 0".to_string()));
    }

    #[tokio::test]
    async fn bad_flag_reply_is_parse_error() {
        let (addr, _peer) = spawn_peer(|_cmd: &str| vec!["2".to_string()]).await;
        let client = connected(addr).await;

        match client.get_mute().await {
            Err(GqrxError::Parse { raw, .. }) => assert_eq!(raw, "2"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(
            client.get_dsp_running().await,
            Err(GqrxError::Parse { .. })
        ));
    }

    #[tokio::test]
    async fn rejected_set_is_protocol_error() {
        let (addr, _peer) = spawn_peer(|_cmd: &str| vec!["RPRT 1".to_string()]).await;
        let client = connected(addr).await;

        assert!(matches!(
            client.set_frequency(1).await,
            Err(GqrxError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn demodulator_reply_cut_short_does_not_hang() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr").to_string();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let (reader, mut writer) = stream.into_split();
            let mut reader = BufReader::new(reader);
            let mut line = String::new();
            let _ = reader.read_line(&mut line).await;
            let _ = writer.write_all(b"FM\n").await;
            // Both halves drop here and the socket closes.
        });

        let client = connected(addr).await;
        let result = tokio::time::timeout(Duration::from_secs(5), client.get_demodulator())
            .await
            .expect("must not hang");
        assert!(matches!(
            result,
            Err(GqrxError::Connection(_)) | Err(GqrxError::Parse { .. })
        ));
        assert_eq!(client.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn operations_after_disconnect_fail_fast() {
        let (addr, _peer) = spawn_peer(gqrx_emulator()).await;
        let client = connected(addr).await;
        client.disconnect().await.expect("disconnect");
        assert_eq!(client.state(), ConnectionState::Closed);

        assert_eq!(
            client.get_frequency().await,
            Err(GqrxError::not_connected())
        );
        assert_eq!(client.set_mute(true).await, Err(GqrxError::not_connected()));
        assert_eq!(client.send_raw("f").await, Err(GqrxError::not_connected()));
        assert!(matches!(
            client.disconnect().await,
            Err(GqrxError::Connection(_))
        ));
        assert!(matches!(
            client.connect().await,
            Err(GqrxError::Connection(_))
        ));
    }

    #[tokio::test]
    async fn operations_before_connect_fail_fast() {
        let client = GqrxClient::new("127.0.0.1:7356");
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert_eq!(
            client.get_squelch().await,
            Err(GqrxError::not_connected())
        );
    }

    #[tokio::test]
    async fn send_raw_passes_line_through() {
        let (addr, peer) =
            spawn_peer(|cmd: &str| vec![format!("echo:{cmd}")]).await;
        let client = connected(addr).await;

        assert_eq!(
            client.send_raw("u RECORD").await.expect("raw"),
            "echo:u RECORD"
        );
        assert_eq!(
            client.send_raw(" AOS ").await.expect("raw"),
            "echo: AOS "
        );
        for bad in ["f\nF 1", "  ", "", "Q", "\\dump_state"] {
            assert!(
                matches!(client.send_raw(bad).await, Err(GqrxError::Validation(_))),
                "{bad:?}"
            );
        }

        client.disconnect().await.expect("disconnect");
        assert_eq!(peer.await.expect("peer"), vec!["u RECORD", " AOS ", "Q"]);
    }

    #[tokio::test]
    async fn raw_demodulator_query_consumes_both_lines() {
        let (addr, peer) = spawn_peer(gqrx_emulator()).await;
        let client = connected(addr).await;

        assert_eq!(client.send_raw("m").await.expect("raw m"), "FM\n10000");
        assert_eq!(client.get_frequency().await.expect("get freq"), 145_500_000);

        assert_eq!(
            client.send_raw_lines("m", 2).await.expect("raw m"),
            vec!["FM".to_string(), "10000".to_string()]
        );
        assert_eq!(client.get_squelch().await.expect("get sql"), -150.0);

        client.disconnect().await.expect("disconnect");
        assert_eq!(
            peer.await.expect("peer"),
            vec!["m", "f", "m", "l SQL", "Q"]
        );
    }

    #[tokio::test]
    async fn abandoned_request_reply_is_not_handed_to_next_caller() {
        let addr = spawn_delayed_peer(Duration::from_millis(300)).await;
        let client = connected(addr).await;

        tokio::time::timeout(Duration::from_millis(50), client.get_frequency())
            .await
            .expect_err("caller gives up before the reply");
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(client.get_squelch().await.expect("get sql"), -150.0);
        assert_eq!(client.get_frequency().await.expect("get freq"), 145_500_000);
        assert_eq!(client.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn concurrent_callers_get_their_own_replies() {
        let (addr, _peer) = spawn_peer(|cmd: &str| vec![format!("echo:{cmd}")]).await;
        let client = Arc::new(connected(addr).await);

        let mut tasks = Vec::new();
        for i in 0..16 {
            let client = Arc::clone(&client);
            tasks.push(tokio::spawn(async move {
                for j in 0..8 {
                    let cmd = format!("PING {i} {j}");
                    let reply = client.send_raw(&cmd).await.expect("reply");
                    assert_eq!(reply, format!("echo:{cmd}"));
                }
            }));
        }
        for task in tasks {
            task.await.expect("caller task");
        }
    }
}
