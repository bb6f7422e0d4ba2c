//! # Verify 模块
//!
//! 远程许可校验客户端：宿主里唯一的并发边界。
//!
//! ## 线程模型
//!
//! 主循环保持单线程。每个请求起一个工作线程做阻塞网络往返，完成后把
//! `(请求 id, 结果)` 投到线程安全的 FIFO 队列；主循环每帧 [`VerifyClient::drain`]
//! 一次，按入队顺序在主线程时间线上同步调用绑定的回调。
//! 除了这条队列没有任何锁：回调表等可变状态只被主线程触碰，
//! 工作线程在交接之前只拥有自己的请求/响应载荷。
//!
//! ## 取消
//!
//! 协作式：调用方对在途请求置位取消标志，工作线程在阻塞调用**返回后**
//! 检查标志，已取消则丢弃结果、不投递队列；网络调用本身不中止。

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// 校验请求载荷
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub license_key: String,
    pub story_id: String,
}

/// 校验响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub valid: bool,
    #[serde(default)]
    pub message: String,
}

/// 校验错误
#[derive(Error, Debug, Clone)]
pub enum VerifyError {
    /// 网络往返或响应解析失败
    #[error("许可校验请求失败: {message}")]
    Transport { message: String },
}

pub type VerifyResult = Result<VerifyResponse, VerifyError>;

/// 传输层抽象：一次阻塞的请求/响应往返
///
/// 默认实现是 [`HttpTransport`]；测试替换为桩实现。
pub trait VerifyTransport: Send + Sync {
    fn round_trip(&self, request: &VerifyRequest) -> VerifyResult;
}

/// reqwest 阻塞客户端上的默认传输层（JSON POST）
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

impl VerifyTransport for HttpTransport {
    fn round_trip(&self, request: &VerifyRequest) -> VerifyResult {
        let transport = |e: reqwest::Error| VerifyError::Transport {
            message: e.to_string(),
        };
        self.client
            .post(&self.endpoint)
            .json(request)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(transport)?
            .json()
            .map_err(transport)
    }
}

type Callback = Box<dyn FnOnce(VerifyResult)>;

/// 在途请求句柄
///
/// 只携带请求 id 与取消标志，可自由克隆到任何需要取消权的地方。
#[derive(Debug, Clone)]
pub struct RequestHandle {
    id: u64,
    cancelled: Arc<AtomicBool>,
}

impl RequestHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// 许可校验客户端（主线程侧）
pub struct VerifyClient {
    transport: Arc<dyn VerifyTransport>,
    tx: Sender<(u64, VerifyResult)>,
    rx: Receiver<(u64, VerifyResult)>,
    callbacks: HashMap<u64, Callback>,
    next_id: u64,
}

impl VerifyClient {
    pub fn new(transport: Arc<dyn VerifyTransport>) -> Self {
        let (tx, rx) = channel();
        Self {
            transport,
            tx,
            rx,
            callbacks: HashMap::new(),
            next_id: 0,
        }
    }

    /// 提交一次校验
    ///
    /// 回调不会在本次调用内执行，而是在之后某帧的 [`Self::drain`] 中
    /// 于主线程调用。
    pub fn submit(
        &mut self,
        request: VerifyRequest,
        callback: impl FnOnce(VerifyResult) + 'static,
    ) -> RequestHandle {
        let id = self.next_id;
        self.next_id += 1;
        let handle = RequestHandle {
            id,
            cancelled: Arc::new(AtomicBool::new(false)),
        };
        self.callbacks.insert(id, Box::new(callback));

        let transport = self.transport.clone();
        let tx = self.tx.clone();
        let cancelled = handle.cancelled.clone();
        thread::spawn(move || {
            let result = transport.round_trip(&request);
            // 阻塞调用返回后才检查取消标志
            if cancelled.load(Ordering::SeqCst) {
                debug!(id, "请求已取消，丢弃结果");
                return;
            }
            // 主线程先退出时通道已关，结果静默丢弃
            let _ = tx.send((id, result));
        });
        handle
    }

    /// 协作式取消：置位标志并移除回调
    pub fn cancel(&mut self, handle: &RequestHandle) {
        handle.cancelled.store(true, Ordering::SeqCst);
        self.callbacks.remove(&handle.id);
    }

    /// 每帧调用一次：按入队（FIFO）顺序取出结果并同步调用回调
    ///
    /// 返回本帧调用的回调数。
    pub fn drain(&mut self) -> usize {
        let mut invoked = 0;
        while let Ok((id, result)) = self.rx.try_recv() {
            if let Some(callback) = self.callbacks.remove(&id) {
                callback(result);
                invoked += 1;
            }
        }
        invoked
    }

    /// 尚未回调的在途请求数
    pub fn pending(&self) -> usize {
        self.callbacks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Condvar, Mutex};
    use std::time::{Duration, Instant};

    fn request(story_id: &str) -> VerifyRequest {
        VerifyRequest {
            license_key: "KEY-1".to_string(),
            story_id: story_id.to_string(),
        }
    }

    /// 立即返回的桩传输层：`story_id == "bad"` 时返回错误
    struct EchoTransport;

    impl VerifyTransport for EchoTransport {
        fn round_trip(&self, request: &VerifyRequest) -> VerifyResult {
            if request.story_id == "bad" {
                return Err(VerifyError::Transport {
                    message: "连接被拒绝".to_string(),
                });
            }
            Ok(VerifyResponse {
                valid: true,
                message: request.story_id.clone(),
            })
        }
    }

    /// 可挡住指定请求的桩传输层
    #[derive(Default)]
    struct Gate {
        open: Mutex<bool>,
        signal: Condvar,
    }

    impl Gate {
        fn release(&self) {
            *self.open.lock().unwrap() = true;
            self.signal.notify_all();
        }

        fn wait(&self) {
            let mut open = self.open.lock().unwrap();
            while !*open {
                open = self.signal.wait(open).unwrap();
            }
        }
    }

    struct GatedTransport {
        gate: Arc<Gate>,
    }

    impl VerifyTransport for GatedTransport {
        fn round_trip(&self, request: &VerifyRequest) -> VerifyResult {
            if request.story_id == "slow" {
                self.gate.wait();
            }
            Ok(VerifyResponse {
                valid: true,
                message: request.story_id.clone(),
            })
        }
    }

    /// 反复 drain 直到累计回调数达到 `want`
    fn drain_until(client: &mut VerifyClient, want: usize) -> usize {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut total = 0;
        while total < want && Instant::now() < deadline {
            total += client.drain();
            thread::sleep(Duration::from_millis(2));
        }
        total
    }

    #[test]
    fn test_callback_runs_on_drain_with_result() {
        let mut client = VerifyClient::new(Arc::new(EchoTransport));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        client.submit(request("ok"), move |result| {
            sink.lock().unwrap().push(result.unwrap().message);
        });
        let sink = seen.clone();
        client.submit(request("bad"), move |result| {
            assert!(matches!(result, Err(VerifyError::Transport { .. })));
            sink.lock().unwrap().push("bad-err".to_string());
        });

        assert_eq!(drain_until(&mut client, 2), 2);
        assert_eq!(client.pending(), 0);

        let mut seen = seen.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen, vec!["bad-err", "ok"]);
    }

    #[test]
    fn test_callbacks_fire_in_queue_order() {
        let gate = Arc::new(Gate::default());
        let mut client = VerifyClient::new(Arc::new(GatedTransport { gate: gate.clone() }));
        let order = Arc::new(Mutex::new(Vec::new()));

        let sink = order.clone();
        client.submit(request("slow"), move |_| {
            sink.lock().unwrap().push("slow");
        });
        let sink = order.clone();
        client.submit(request("fast"), move |_| {
            sink.lock().unwrap().push("fast");
        });

        // fast 先完成、先入队，即使 slow 先提交
        assert_eq!(drain_until(&mut client, 1), 1);
        assert_eq!(*order.lock().unwrap(), vec!["fast"]);

        gate.release();
        assert_eq!(drain_until(&mut client, 1), 1);
        assert_eq!(*order.lock().unwrap(), vec!["fast", "slow"]);
    }

    #[test]
    fn test_cancelled_request_never_calls_back() {
        let gate = Arc::new(Gate::default());
        let mut client = VerifyClient::new(Arc::new(GatedTransport { gate: gate.clone() }));

        let handle = client.submit(request("slow"), move |_| {
            panic!("已取消的请求不应回调");
        });
        client.cancel(&handle);
        assert!(handle.is_cancelled());
        assert_eq!(client.pending(), 0);

        gate.release();
        // 给工作线程时间完成并（错误地）投递
        thread::sleep(Duration::from_millis(50));
        assert_eq!(client.drain(), 0);
    }
}
