//! 撮合器
//!
//! 单个任务独占身份表和会话表，其他任务只能通过 [`MatchmakerHandle`] 发命令。
//! 每凑齐两个等待中的身份就创建一个会话并启动会话任务；
//! 会话结束时交回报告，撮合器据此清理两张表。

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::session::{Identity, Seat, Session, SessionId, SessionReport};

/// 命令信箱容量
const COMMAND_CAPACITY: usize = 64;

/// 撮合器错误
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchmakerError {
    /// 重试多次仍未生成未占用的身份
    #[error("Identity generation exhausted after {attempts} attempts")]
    IdentityExhausted { attempts: u32 },

    /// 重试多次仍未生成未占用的会话 ID
    #[error("Session id generation exhausted after {attempts} attempts")]
    SessionIdExhausted { attempts: u32 },

    /// 撮合器任务已退出
    #[error("Matchmaker unavailable")]
    Unavailable,
}

/// 接纳结果：分配的身份，以及配对成功后送达的座位
#[derive(Debug)]
pub struct Admission {
    pub identity: Identity,
    pub seat: oneshot::Receiver<Seat>,
}

/// 撮合器统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchmakerStats {
    /// 等待配对的身份数
    pub waiting: usize,
    /// 进行中的会话数
    pub active_sessions: usize,
    /// 已登记的身份数（等待中 + 会话中）
    pub registered_identities: usize,
}

enum Command {
    Admit {
        reply: oneshot::Sender<Result<Admission, MatchmakerError>>,
    },
    Withdraw {
        identity: Identity,
    },
    SessionOf {
        identity: Identity,
        reply: oneshot::Sender<Option<SessionId>>,
    },
    Stats {
        reply: oneshot::Sender<MatchmakerStats>,
    },
}

/// 等待配对的身份
struct Waiting {
    identity: Identity,
    seat: oneshot::Sender<Seat>,
}

/// 进行中的会话
#[derive(Debug, Clone, Copy)]
struct SessionRecord {
    white: Identity,
    black: Identity,
    started_at: DateTime<Utc>,
}

/// 撮合器
pub struct Matchmaker<R> {
    rng: R,
    mailbox_capacity: usize,
    max_id_retries: u32,
    /// 身份 -> 所在会话（等待中为 None）
    identities: HashMap<Identity, Option<SessionId>>,
    /// 会话 ID -> 会话记录
    sessions: HashMap<SessionId, SessionRecord>,
    waiting: VecDeque<Waiting>,
    commands: mpsc::Receiver<Command>,
    reports_tx: mpsc::UnboundedSender<SessionReport>,
    reports_rx: mpsc::UnboundedReceiver<SessionReport>,
}

impl Matchmaker<StdRng> {
    /// 使用系统熵创建撮合器并在后台运行
    pub fn spawn(config: &ServerConfig) -> MatchmakerHandle {
        let (matchmaker, handle) = Self::new(config, StdRng::from_entropy());
        tokio::spawn(matchmaker.run());
        handle
    }
}

impl<R: Rng + Send + 'static> Matchmaker<R> {
    /// 创建撮合器和对应的句柄
    pub fn new(config: &ServerConfig, rng: R) -> (Self, MatchmakerHandle) {
        let (commands_tx, commands) = mpsc::channel(COMMAND_CAPACITY);
        let (reports_tx, reports_rx) = mpsc::unbounded_channel();

        let matchmaker = Self {
            rng,
            mailbox_capacity: config.mailbox_capacity,
            max_id_retries: config.max_id_retries,
            identities: HashMap::new(),
            sessions: HashMap::new(),
            waiting: VecDeque::new(),
            commands,
            reports_tx,
            reports_rx,
        };
        (matchmaker, MatchmakerHandle { commands: commands_tx })
    }

    /// 处理命令和会话报告，直到所有句柄都被丢弃
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                Some(report) = self.reports_rx.recv() => self.finish(report),
            }
        }
        info!(
            active_sessions = self.sessions.len(),
            "撮合器句柄已全部释放，停止接纳"
        );
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Admit { reply } => {
                let result = self.admit();
                let _ = reply.send(result);
                self.try_pair();
            }
            Command::Withdraw { identity } => self.withdraw(identity),
            Command::SessionOf { identity, reply } => {
                let _ = reply.send(self.identities.get(&identity).copied().flatten());
            }
            Command::Stats { reply } => {
                let _ = reply.send(self.stats());
            }
        }
    }

    /// 生成新身份并加入等待队列
    fn admit(&mut self) -> Result<Admission, MatchmakerError> {
        let identities = &self.identities;
        let identity = generate_id(&mut self.rng, self.max_id_retries, |id| {
            identities.contains_key(&id)
        })
        .ok_or(MatchmakerError::IdentityExhausted {
            attempts: self.max_id_retries,
        })
        .inspect_err(|e| warn!(error = %e, "无法生成身份"))?;

        let (seat_tx, seat_rx) = oneshot::channel();
        self.identities.insert(identity, None);
        self.waiting.push_back(Waiting {
            identity,
            seat: seat_tx,
        });
        info!(identity, waiting = self.waiting.len(), "参与者进入等待");

        Ok(Admission {
            identity,
            seat: seat_rx,
        })
    }

    /// 离开等待队列；已在会话中的身份由会话自行结束
    fn withdraw(&mut self, identity: Identity) {
        let before = self.waiting.len();
        self.waiting.retain(|entry| entry.identity != identity);
        if self.waiting.len() < before {
            self.identities.remove(&identity);
            info!(identity, "参与者离开等待队列");
        }
    }

    /// 清理已失效的等待者，然后两两配对
    fn try_pair(&mut self) {
        let identities = &mut self.identities;
        self.waiting.retain(|entry| {
            let alive = !entry.seat.is_closed();
            if !alive {
                identities.remove(&entry.identity);
            }
            alive
        });

        while self.waiting.len() >= 2 {
            let (Some(white), Some(black)) = (self.waiting.pop_front(), self.waiting.pop_front())
            else {
                break;
            };

            let sessions = &self.sessions;
            let Some(session_id) = generate_id(&mut self.rng, self.max_id_retries, |id| {
                sessions.contains_key(&id)
            }) else {
                let e = MatchmakerError::SessionIdExhausted {
                    attempts: self.max_id_retries,
                };
                error!(white = white.identity, black = black.identity, error = %e, "无法创建会话");
                self.identities.remove(&white.identity);
                self.identities.remove(&black.identity);
                continue;
            };

            self.start_session(session_id, white, black);
        }
    }

    fn start_session(&mut self, session_id: SessionId, white: Waiting, black: Waiting) {
        let (session, white_seat, black_seat) = Session::pair(
            session_id,
            white.identity,
            black.identity,
            self.mailbox_capacity,
        );

        self.identities.insert(white.identity, Some(session_id));
        self.identities.insert(black.identity, Some(session_id));
        self.sessions.insert(
            session_id,
            SessionRecord {
                white: white.identity,
                black: black.identity,
                started_at: Utc::now(),
            },
        );

        // 座位送达失败时座位被丢弃，会话会把它当作断开处理
        let _ = white.seat.send(white_seat);
        let _ = black.seat.send(black_seat);

        let reports = self.reports_tx.clone();
        tokio::spawn(async move {
            let report = session.run().await;
            let _ = reports.send(report);
        });

        info!(
            session_id,
            white = white.identity,
            black = black.identity,
            active_sessions = self.sessions.len(),
            "配对成功"
        );
    }

    /// 会话结束，清理登记
    fn finish(&mut self, report: SessionReport) {
        let Some(record) = self.sessions.remove(&report.session_id) else {
            warn!(session_id = report.session_id, "收到未登记会话的报告");
            return;
        };
        self.identities.remove(&record.white);
        self.identities.remove(&record.black);

        let elapsed = report.ended_at - record.started_at;
        info!(
            session_id = report.session_id,
            end = ?report.end,
            moves = report.moves.len(),
            elapsed_ms = elapsed.num_milliseconds(),
            active_sessions = self.sessions.len(),
            "会话已清理"
        );
    }

    fn stats(&self) -> MatchmakerStats {
        MatchmakerStats {
            waiting: self.waiting.len(),
            active_sessions: self.sessions.len(),
            registered_identities: self.identities.len(),
        }
    }
}

/// 在有限次数内生成一个未被占用的 ID
fn generate_id<R: Rng>(rng: &mut R, attempts: u32, taken: impl Fn(u64) -> bool) -> Option<u64> {
    (0..attempts).map(|_| rng.gen::<u64>()).find(|&id| !taken(id))
}

/// 撮合器句柄
#[derive(Clone)]
pub struct MatchmakerHandle {
    commands: mpsc::Sender<Command>,
}

impl MatchmakerHandle {
    /// 申请一个新身份并进入等待队列
    pub async fn admit(&self) -> Result<Admission, MatchmakerError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Admit { reply }).await?;
        rx.await.map_err(|_| MatchmakerError::Unavailable)?
    }

    /// 配对前离开等待队列
    pub async fn withdraw(&self, identity: Identity) -> Result<(), MatchmakerError> {
        self.send(Command::Withdraw { identity }).await
    }

    /// 查询身份所在的会话
    pub async fn session_of(&self, identity: Identity) -> Result<Option<SessionId>, MatchmakerError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::SessionOf { identity, reply }).await?;
        rx.await.map_err(|_| MatchmakerError::Unavailable)
    }

    /// 查询统计信息
    pub async fn stats(&self) -> Result<MatchmakerStats, MatchmakerError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Stats { reply }).await?;
        rx.await.map_err(|_| MatchmakerError::Unavailable)
    }

    async fn send(&self, command: Command) -> Result<(), MatchmakerError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| MatchmakerError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Signal;
    use protocol::Color;
    use rand::rngs::mock::StepRng;
    use rand::RngCore;
    use std::collections::VecDeque;
    use std::time::Duration;

    /// 先依次给出预设值，之后一直给出同一个值
    struct ScriptedRng {
        script: VecDeque<u64>,
        then: u64,
    }

    impl RngCore for ScriptedRng {
        fn next_u32(&mut self) -> u32 {
            self.next_u64() as u32
        }

        fn next_u64(&mut self) -> u64 {
            self.script.pop_front().unwrap_or(self.then)
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            StepRng::new(self.next_u64(), 0).fill_bytes(dest)
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    fn spawn_with<R: Rng + Send + 'static>(rng: R) -> MatchmakerHandle {
        let (matchmaker, handle) = Matchmaker::new(&ServerConfig::default(), rng);
        tokio::spawn(matchmaker.run());
        handle
    }

    /// 轮询直到统计满足条件
    async fn wait_for_stats(
        handle: &MatchmakerHandle,
        predicate: impl Fn(&MatchmakerStats) -> bool,
    ) -> MatchmakerStats {
        for _ in 0..200 {
            let stats = handle.stats().await.unwrap();
            if predicate(&stats) {
                return stats;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("统计未达到预期: {:?}", handle.stats().await);
    }

    #[test]
    fn test_generate_id_bounded() {
        let mut rng = StepRng::new(7, 0);
        assert_eq!(generate_id(&mut rng, 3, |_| false), Some(7));
        assert_eq!(generate_id(&mut rng, 3, |id| id == 7), None);

        let mut rng = StepRng::new(1, 1);
        assert_eq!(generate_id(&mut rng, 5, |id| id < 3), Some(3));
    }

    #[tokio::test]
    async fn test_pairing_assigns_one_session_per_identity() {
        let handle = spawn_with(StepRng::new(1, 1));

        let mut admissions = Vec::new();
        for _ in 0..4 {
            admissions.push(handle.admit().await.unwrap());
        }

        let mut seats = Vec::new();
        for admission in admissions {
            let seat = admission.seat.await.unwrap();
            assert_eq!(seat.identity, admission.identity);
            assert_eq!(
                handle.session_of(seat.identity).await.unwrap(),
                Some(seat.session_id)
            );
            seats.push(seat);
        }

        // 先进入等待的一方执白
        assert_eq!(seats[0].color, Color::White);
        assert_eq!(seats[1].color, Color::Black);
        assert_eq!(seats[0].session_id, seats[1].session_id);
        assert_eq!(seats[2].session_id, seats[3].session_id);
        assert_ne!(seats[0].session_id, seats[2].session_id);

        let stats = handle.stats().await.unwrap();
        assert_eq!(
            stats,
            MatchmakerStats {
                waiting: 0,
                active_sessions: 2,
                registered_identities: 4,
            }
        );
    }

    #[tokio::test]
    async fn test_ended_session_is_cleaned_up() {
        let handle = spawn_with(StepRng::new(1, 1));

        let first = handle.admit().await.unwrap();
        let second = handle.admit().await.unwrap();
        let white = first.seat.await.unwrap();
        let black = second.seat.await.unwrap();

        white.requests.send(Signal::Disconnected).await.unwrap();

        let stats = wait_for_stats(&handle, |s| s.active_sessions == 0).await;
        assert_eq!(stats.registered_identities, 0);
        assert_eq!(handle.session_of(black.identity).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_withdraw_before_pairing() {
        let handle = spawn_with(StepRng::new(1, 1));

        let admission = handle.admit().await.unwrap();
        assert_eq!(handle.stats().await.unwrap().waiting, 1);

        handle.withdraw(admission.identity).await.unwrap();
        assert_eq!(handle.stats().await.unwrap(), MatchmakerStats::default());
        assert!(admission.seat.await.is_err());
    }

    #[tokio::test]
    async fn test_abandoned_waiter_is_pruned() {
        let handle = spawn_with(StepRng::new(1, 1));

        let gone = handle.admit().await.unwrap();
        drop(gone.seat);

        let _waiting = handle.admit().await.unwrap();
        let stats = handle.stats().await.unwrap();
        assert_eq!(stats.waiting, 1);
        assert_eq!(stats.active_sessions, 0);
        assert_eq!(handle.session_of(gone.identity).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_identity_exhausted() {
        let handle = spawn_with(StepRng::new(7, 0));

        let first = handle.admit().await.unwrap();
        assert_eq!(first.identity, 7);

        assert_eq!(
            handle.admit().await.unwrap_err(),
            MatchmakerError::IdentityExhausted {
                attempts: ServerConfig::default().max_id_retries
            }
        );
    }

    #[tokio::test]
    async fn test_session_id_exhausted_drops_waiters() {
        // 身份 1、2 配成会话 3；之后身份 4、5 的会话 ID 始终撞上 3
        let handle = spawn_with(ScriptedRng {
            script: VecDeque::from([1, 2, 3, 4, 5]),
            then: 3,
        });

        let first = handle.admit().await.unwrap();
        let second = handle.admit().await.unwrap();
        let _white = first.seat.await.unwrap();
        let _black = second.seat.await.unwrap();
        assert_eq!(handle.session_of(1).await.unwrap(), Some(3));

        let third = handle.admit().await.unwrap();
        let fourth = handle.admit().await.unwrap();
        assert_eq!((third.identity, fourth.identity), (4, 5));
        assert!(third.seat.await.is_err());
        assert!(fourth.seat.await.is_err());

        let stats = handle.stats().await.unwrap();
        assert_eq!(stats.waiting, 0);
        assert_eq!(stats.active_sessions, 1);
        // 只剩第一对会话中的身份
        assert_eq!(stats.registered_identities, 2);
        assert_eq!(handle.session_of(4).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unavailable_after_shutdown() {
        let (matchmaker, handle) = Matchmaker::new(&ServerConfig::default(), StepRng::new(1, 1));
        drop(matchmaker);
        assert_eq!(
            handle.stats().await.unwrap_err(),
            MatchmakerError::Unavailable
        );
    }
}
