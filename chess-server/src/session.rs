//! 对局会话
//!
//! 每对参与者一个会话任务，独占自己的 [`Game`]，只通过信箱与外界通信：
//! 每个参与者一个入站信箱（[`Signal`]）和一个出站信箱（[`Event`]）。
//!
//! 状态机：`WaitingForBothParticipants` → `AwaitingMove(Color)` → `Ended`。
//! 任意一方断开都会结束整个会话，并关闭双方信箱。

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

use protocol::{
    ChessError, Color, Coord, Event, Fen, Game, Move, Notation, Outcome, Request, Winner,
};

/// 参与者身份
pub type Identity = u64;

/// 会话 ID
pub type SessionId = u64;

/// 传输层交给会话的入站信号
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// 连接已就绪
    Connected,
    /// 参与者请求
    Request(Request),
    /// 收到无法解码的请求
    Malformed { reason: String },
    /// 连接已断开
    Disconnected,
}

/// 会话错误
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    /// 一方断开，会话必须结束
    #[error("{color:?} participant disconnected")]
    Disconnected { color: Color },
}

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    WaitingForBothParticipants,
    AwaitingMove(Color),
    Ended,
}

/// 会话结束原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EndReason {
    /// 一方吃掉了对方的王
    KingCaptured { winner: Color },
    /// 一方断开
    Disconnected { color: Color },
}

/// 会话结束后交回给撮合器的报告
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionReport {
    pub session_id: SessionId,
    pub white: Identity,
    pub black: Identity,
    pub end: EndReason,
    /// 已执行的走法
    pub moves: Vec<Move>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

/// 交给传输层的座位：会话中一方的两个信箱端点
#[derive(Debug)]
pub struct Seat {
    pub identity: Identity,
    pub session_id: SessionId,
    pub color: Color,
    /// 向会话发送信号
    pub requests: mpsc::Sender<Signal>,
    /// 接收会话事件，会话结束时关闭
    pub events: mpsc::Receiver<Event>,
}

/// 会话持有的一方信箱端点
struct Participant {
    identity: Identity,
    requests: mpsc::Receiver<Signal>,
    events: mpsc::Sender<Event>,
}

impl Participant {
    fn new(identity: Identity, session_id: SessionId, color: Color, capacity: usize) -> (Self, Seat) {
        let (request_tx, request_rx) = mpsc::channel(capacity);
        let (event_tx, event_rx) = mpsc::channel(capacity);

        let participant = Self {
            identity,
            requests: request_rx,
            events: event_tx,
        };
        let seat = Seat {
            identity,
            session_id,
            color,
            requests: request_tx,
            events: event_rx,
        };
        (participant, seat)
    }
}

/// 对局会话
pub struct Session {
    id: SessionId,
    white: Participant,
    black: Participant,
    state: SessionState,
    started_at: DateTime<Utc>,
}

impl Session {
    /// 为两个身份创建会话，返回会话本身和双方的座位
    pub fn pair(
        id: SessionId,
        white: Identity,
        black: Identity,
        capacity: usize,
    ) -> (Self, Seat, Seat) {
        let (white, white_seat) = Participant::new(white, id, Color::White, capacity);
        let (black, black_seat) = Participant::new(black, id, Color::Black, capacity);

        let session = Self {
            id,
            white,
            black,
            state: SessionState::WaitingForBothParticipants,
            started_at: Utc::now(),
        };
        (session, white_seat, black_seat)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// 运行会话直到结束
    pub async fn run(mut self) -> SessionReport {
        info!(
            session_id = self.id,
            white = self.white.identity,
            black = self.black.identity,
            "会话开始，等待双方就绪"
        );

        let mut game = Game::new();
        let result = self.drive(&mut game).await;
        self.state = SessionState::Ended;

        let end = match result {
            Ok(winner) => EndReason::KingCaptured { winner },
            Err(SessionError::Disconnected { color }) => EndReason::Disconnected { color },
        };

        let report = SessionReport {
            session_id: self.id,
            white: self.white.identity,
            black: self.black.identity,
            end,
            moves: game.history().to_vec(),
            started_at: self.started_at,
            ended_at: Utc::now(),
        };

        info!(
            session_id = self.id,
            end = ?report.end,
            moves = report.moves.len(),
            fen = %Fen::to_fen(&game),
            "会话结束"
        );

        // 丢弃会话即关闭双方信箱
        drop(self);
        report
    }

    /// 驱动状态机，返回胜方；断开时返回错误
    async fn drive(&mut self, game: &mut Game) -> Result<Color, SessionError> {
        self.wait_for_both().await?;

        self.send(Color::White, Event::GameStart { moves_first: true })
            .await?;
        self.send(Color::Black, Event::GameStart { moves_first: false })
            .await?;
        self.state = SessionState::AwaitingMove(game.turn());
        info!(session_id = self.id, "双方就绪，对局开始");

        loop {
            let (color, signal) = self.next_signal().await;

            let request = match signal {
                Signal::Disconnected => return Err(SessionError::Disconnected { color }),
                Signal::Connected => {
                    debug!(session_id = self.id, ?color, "忽略重复的就绪信号");
                    continue;
                }
                _ if self.state != SessionState::AwaitingMove(color) => {
                    debug!(session_id = self.id, ?color, "不是该方回合，丢弃请求");
                    continue;
                }
                Signal::Malformed { reason } => {
                    debug!(session_id = self.id, ?color, %reason, "请求无法解码");
                    self.send(color, Event::IllegalMove).await?;
                    continue;
                }
                Signal::Request(request) => request,
            };

            let Request::Move { from, to } = request;
            let (from, to, outcome) = match Self::apply(game, color, &from, &to) {
                Ok(applied) => applied,
                Err(e) => {
                    debug!(session_id = self.id, ?color, error = %e, "走法被拒绝");
                    self.send(color, Event::IllegalMove).await?;
                    continue;
                }
            };

            debug!(session_id = self.id, ?color, %from, %to, "走法已接受");
            let opponent = color.opponent();
            let accepted = Event::MoveAccepted { outcome };
            let relayed = Event::PlayerTurn { from, to, outcome };

            match outcome {
                Outcome::Continuing => {
                    self.send(color, accepted).await?;
                    self.send(opponent, relayed).await?;
                    self.state = SessionState::AwaitingMove(opponent);
                }
                Outcome::GameEnded { winner } => {
                    // 胜负已定，之后的投递失败不改变结果
                    let _ = self.send(color, accepted).await;
                    let _ = self.send(opponent, relayed).await;
                    for receiver in [Color::White, Color::Black] {
                        let event = Event::GameEnded {
                            winner: Winner::relative_to(winner, receiver),
                        };
                        let _ = self.send(receiver, event).await;
                    }
                    return Ok(winner);
                }
            }
        }
    }

    /// 解析坐标并交给裁判执行
    fn apply(
        game: &mut Game,
        color: Color,
        from: &str,
        to: &str,
    ) -> Result<(Coord, Coord, Outcome), ChessError> {
        let from = Notation::parse(from)?;
        let to = Notation::parse(to)?;
        let outcome = game.play(color, from, to)?;
        Ok((from, to, outcome))
    }

    /// 等待双方都发来就绪信号，期间的其他请求被丢弃
    async fn wait_for_both(&mut self) -> Result<(), SessionError> {
        let mut white_ready = false;
        let mut black_ready = false;

        while !(white_ready && black_ready) {
            let (color, signal) = self.next_signal().await;
            match signal {
                Signal::Connected => match color {
                    Color::White => white_ready = true,
                    Color::Black => black_ready = true,
                },
                Signal::Disconnected => return Err(SessionError::Disconnected { color }),
                _ => debug!(session_id = self.id, ?color, "对局未开始，丢弃请求"),
            }
        }
        Ok(())
    }

    /// 等待任意一方的下一个信号；信箱关闭视为断开
    async fn next_signal(&mut self) -> (Color, Signal) {
        tokio::select! {
            signal = self.white.requests.recv() => {
                (Color::White, signal.unwrap_or(Signal::Disconnected))
            }
            signal = self.black.requests.recv() => {
                (Color::Black, signal.unwrap_or(Signal::Disconnected))
            }
        }
    }

    /// 向一方发送事件；对方信箱已关闭时返回断开错误
    async fn send(&self, color: Color, event: Event) -> Result<(), SessionError> {
        let participant = match color {
            Color::White => &self.white,
            Color::Black => &self.black,
        };

        if participant.events.is_closed() {
            return Err(SessionError::Disconnected { color });
        }
        participant
            .events
            .send(event)
            .await
            .map_err(|_| SessionError::Disconnected { color })
    }
}
