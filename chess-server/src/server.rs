//! TCP 接入层
//!
//! 每个连接：向撮合器申请身份，启动入站读取任务，等待配对。
//! 配对前断开则撤回身份；配对后启动出站转发任务，
//! 发送就绪信号，然后把入站信号转给会话，直到任意一方结束。

use anyhow::{Context, Result};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use protocol::{
    Connection, Event, FrameReader, FrameWriter, Listener, ProtocolError, Request,
    TcpConnection, TcpListener,
};

use crate::config::ServerConfig;
use crate::matchmaker::MatchmakerHandle;
use crate::session::{Identity, Seat, Signal};

/// 服务器
pub struct Server {
    listener: TcpListener,
    matchmaker: MatchmakerHandle,
    mailbox_capacity: usize,
}

impl Server {
    /// 绑定监听地址
    pub async fn bind(config: &ServerConfig, matchmaker: MatchmakerHandle) -> Result<Self> {
        let addr = config.network.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("无法监听 {}", addr))?;

        Ok(Self {
            listener,
            matchmaker,
            mailbox_capacity: config.mailbox_capacity,
        })
    }

    /// 实际监听地址
    pub fn local_addr(&self) -> Option<String> {
        self.listener.local_addr()
    }

    /// 接受连接，每个连接一个任务
    pub async fn run(mut self) -> Result<()> {
        info!(addr = ?self.local_addr(), "服务器开始接受连接");

        loop {
            match self.listener.accept().await {
                Ok(conn) => {
                    let matchmaker = self.matchmaker.clone();
                    tokio::spawn(handle_connection(conn, matchmaker, self.mailbox_capacity));
                }
                Err(e) => warn!(error = %e, "接受连接失败"),
            }
        }
    }
}

/// 处理单个连接的完整生命周期
async fn handle_connection(conn: TcpConnection, matchmaker: MatchmakerHandle, capacity: usize) {
    let peer = conn.peer_addr().unwrap_or_default();
    let admission = match matchmaker.admit().await {
        Ok(admission) => admission,
        Err(e) => {
            warn!(%peer, error = %e, "无法接纳连接");
            return;
        }
    };
    let identity = admission.identity;
    debug!(identity, %peer, "连接已接纳");

    let (reader, writer) = conn.split();
    let (inbound_tx, mut inbound) = mpsc::channel(capacity);
    let reader_task = tokio::spawn(read_requests(reader, inbound_tx));

    let seat = tokio::select! {
        seat = admission.seat => match seat {
            Ok(seat) => seat,
            Err(_) => {
                warn!(identity, "撮合器未能分配座位，关闭连接");
                reader_task.abort();
                return;
            }
        },
        _ = drain_until_disconnect(&mut inbound) => {
            if let Err(e) = matchmaker.withdraw(identity).await {
                warn!(identity, error = %e, "撤回身份失败");
            }
            info!(identity, "配对前断开");
            reader_task.abort();
            return;
        }
    };

    let Seat {
        session_id,
        color,
        requests,
        events,
        ..
    } = seat;
    info!(identity, session_id, ?color, "已入座");

    let relay = tokio::spawn(relay_events(writer, events, identity));

    if requests.send(Signal::Connected).await.is_ok() {
        forward_signals(&mut inbound, &requests).await;
    }

    reader_task.abort();
    drop(requests);
    let _ = relay.await;
    debug!(identity, session_id, "连接处理结束");
}

/// 配对前的入站信号一律丢弃，直到断开
async fn drain_until_disconnect(inbound: &mut mpsc::Receiver<Signal>) {
    while let Some(signal) = inbound.recv().await {
        if signal == Signal::Disconnected {
            return;
        }
    }
}

/// 把入站信号转给会话；断开或会话关闭信箱时停止
async fn forward_signals(inbound: &mut mpsc::Receiver<Signal>, requests: &mpsc::Sender<Signal>) {
    loop {
        let signal = tokio::select! {
            _ = requests.closed() => return,
            signal = inbound.recv() => signal.unwrap_or(Signal::Disconnected),
        };

        let last = signal == Signal::Disconnected;
        if requests.send(signal).await.is_err() || last {
            return;
        }
    }
}

/// 读取请求帧；结束时恰好发送一次断开信号
async fn read_requests(mut reader: FrameReader<OwnedReadHalf>, inbound: mpsc::Sender<Signal>) {
    loop {
        let signal = match reader.read_frame::<Request>().await {
            Ok(request) => Signal::Request(request),
            Err(ProtocolError::Bincode(e)) => Signal::Malformed {
                reason: e.to_string(),
            },
            Err(ProtocolError::ConnectionClosed) => break,
            Err(e) => {
                debug!(error = %e, "读取请求失败");
                break;
            }
        };

        if inbound.send(signal).await.is_err() {
            return;
        }
    }

    let _ = inbound.send(Signal::Disconnected).await;
}

/// 按顺序写出会话事件，信箱关闭后关闭写端
async fn relay_events(
    mut writer: FrameWriter<OwnedWriteHalf>,
    mut events: mpsc::Receiver<Event>,
    identity: Identity,
) {
    while let Some(event) = events.recv().await {
        if let Err(e) = writer.write_frame(&event).await {
            warn!(identity, error = %e, "写出事件失败");
            return;
        }
    }

    if let Err(e) = writer.shutdown().await {
        debug!(identity, error = %e, "关闭写端失败");
    }
}
