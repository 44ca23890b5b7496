// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 推理工作线程 (Inference Worker)
/// 职责: 持有采样器与传输, 在独立线程中完成 采样 → 上传 → 解析
///
/// 只有一个工作线程, 所以任意时刻网络上最多只有一个请求 (跨 stop/start 也成立)
/// 排队中的旧代数任务在发出前被跳过, 只有已在途的请求无法撤回
use crate::detection::InferenceResponse;
use crate::error::CycleError;
use crate::input::VideoFrame;
use crate::pipeline::client::InferenceTransport;
use crate::pipeline::sampler::FrameSampler;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

/// 一轮推理任务
#[derive(Clone, Debug)]
pub struct InferenceJob {
    pub generation: u64,
    pub frame: VideoFrame,
    pub threshold: f32,
}

/// 一轮推理结果, 每个执行过的任务恰好对应一个
#[derive(Debug)]
pub struct InferenceReply {
    pub generation: u64,
    pub outcome: Result<InferenceResponse, CycleError>,
}

pub struct InferenceWorker {
    job_tx: Sender<InferenceJob>,
    reply_rx: Receiver<InferenceReply>,
    generation: Arc<AtomicU64>,
    _thread: JoinHandle<()>,
}

impl InferenceWorker {
    pub fn spawn<T>(transport: Arc<T>, sampler: FrameSampler) -> Self
    where
        T: InferenceTransport + ?Sized + 'static,
    {
        let (job_tx, job_rx) = crossbeam_channel::bounded::<InferenceJob>(1);
        let (reply_tx, reply_rx) = crossbeam_channel::unbounded::<InferenceReply>();
        let generation = Arc::new(AtomicU64::new(0));
        let current = generation.clone();

        let thread = std::thread::spawn(move || {
            for job in job_rx.iter() {
                if job.generation < current.load(Ordering::SeqCst) {
                    log::debug!("⏭️ 跳过过期任务 gen={}", job.generation);
                    continue;
                }

                let started = Instant::now();
                let outcome = run_cycle(transport.as_ref(), &sampler, &job);
                log::debug!(
                    "🧠 推理完成 gen={} 耗时={:.1}ms ok={}",
                    job.generation,
                    started.elapsed().as_secs_f64() * 1000.0,
                    outcome.is_ok()
                );

                let reply = InferenceReply {
                    generation: job.generation,
                    outcome,
                };
                if reply_tx.send(reply).is_err() {
                    break;
                }
            }
            log::debug!("🧠 推理线程退出");
        });

        Self {
            job_tx,
            reply_rx,
            generation,
            _thread: thread,
        }
    }

    /// 投递任务 (不阻塞), 队列已满时原样退回
    pub fn dispatch(&self, job: InferenceJob) -> Result<(), InferenceJob> {
        match self.job_tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(job)) | Err(TrySendError::Disconnected(job)) => Err(job),
        }
    }

    /// 当前会话代数, 低于该代数的排队任务不再发出
    pub fn set_generation(&self, generation: u64) {
        self.generation.store(generation, Ordering::SeqCst);
    }

    /// 已完成的结果 (不阻塞)
    pub fn replies(&self) -> crossbeam_channel::TryIter<'_, InferenceReply> {
        self.reply_rx.try_iter()
    }

    pub fn receiver(&self) -> &Receiver<InferenceReply> {
        &self.reply_rx
    }
}

fn run_cycle<T: InferenceTransport + ?Sized>(
    transport: &T,
    sampler: &FrameSampler,
    job: &InferenceJob,
) -> Result<InferenceResponse, CycleError> {
    let blob = sampler.sample(&job.frame)?;
    Ok(transport.predict(&blob, job.threshold)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{InferenceError, SampleError};
    use crate::pipeline::sampler::ImageBlob;
    use image::RgbaImage;
    use std::sync::Mutex;
    use std::time::Duration;

    /// 每次调用都阻塞一段时间的后端
    struct SlowTransport {
        latency: Duration,
        thresholds: Mutex<Vec<f32>>,
    }

    impl InferenceTransport for SlowTransport {
        fn predict(
            &self,
            _image: &ImageBlob,
            threshold: f32,
        ) -> Result<InferenceResponse, InferenceError> {
            self.thresholds.lock().unwrap().push(threshold);
            std::thread::sleep(self.latency);
            Ok(InferenceResponse { detections: None })
        }
    }

    struct RecordingTransport {
        thresholds: Mutex<Vec<f32>>,
        fail: bool,
    }

    impl InferenceTransport for RecordingTransport {
        fn predict(
            &self,
            image: &ImageBlob,
            threshold: f32,
        ) -> Result<InferenceResponse, InferenceError> {
            assert_eq!(image.width, 320);
            self.thresholds.lock().unwrap().push(threshold);
            if self.fail {
                Err(InferenceError::Status(503))
            } else {
                Ok(InferenceResponse {
                    detections: Some(vec![]),
                })
            }
        }
    }

    /// 队列已满时重试直到投递成功
    fn dispatch_eventually(worker: &InferenceWorker, mut job: InferenceJob) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while let Err(rejected) = worker.dispatch(job) {
            assert!(Instant::now() < deadline, "worker queue never drained");
            job = rejected;
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn job(generation: u64, width: u32, height: u32) -> InferenceJob {
        InferenceJob {
            generation,
            frame: VideoFrame::new(RgbaImage::new(width, height)),
            threshold: 0.7,
        }
    }

    #[test]
    fn test_each_job_yields_one_reply() {
        let transport = Arc::new(RecordingTransport {
            thresholds: Mutex::new(Vec::new()),
            fail: false,
        });
        let worker = InferenceWorker::spawn(transport.clone(), FrameSampler::default());

        worker.dispatch(job(3, 640, 480)).unwrap();
        let reply = worker
            .receiver()
            .recv_timeout(Duration::from_secs(5))
            .unwrap();
        assert_eq!(reply.generation, 3);
        assert!(reply.outcome.unwrap().detections.unwrap().is_empty());
        assert_eq!(*transport.thresholds.lock().unwrap(), vec![0.7]);
        assert_eq!(worker.replies().count(), 0);
    }

    #[test]
    fn test_failures_are_replies_too() {
        let transport = Arc::new(RecordingTransport {
            thresholds: Mutex::new(Vec::new()),
            fail: true,
        });
        let worker = InferenceWorker::spawn(transport, FrameSampler::default());

        worker.dispatch(job(1, 640, 480)).unwrap();
        let reply = worker
            .receiver()
            .recv_timeout(Duration::from_secs(5))
            .unwrap();
        assert!(matches!(
            reply.outcome,
            Err(CycleError::Inference(InferenceError::Status(503)))
        ));

        // 采样失败同样产生回复, 且不会触达传输层
        worker.dispatch(job(2, 0, 0)).unwrap();
        let reply = worker
            .receiver()
            .recv_timeout(Duration::from_secs(5))
            .unwrap();
        assert_eq!(reply.generation, 2);
        assert!(matches!(
            reply.outcome,
            Err(CycleError::Sample(SampleError::NotReady))
        ));
    }

    #[test]
    fn test_stale_queued_job_is_skipped() {
        let transport = Arc::new(SlowTransport {
            latency: Duration::from_millis(200),
            thresholds: Mutex::new(Vec::new()),
        });
        let worker = InferenceWorker::spawn(transport.clone(), FrameSampler::default());
        worker.set_generation(1);

        let tagged = |generation: u64, threshold: f32| InferenceJob {
            threshold,
            ..job(generation, 64, 48)
        };

        // gen1 在途, gen3 排队
        dispatch_eventually(&worker, tagged(1, 0.1));
        dispatch_eventually(&worker, tagged(3, 0.3));

        // 两次 stop/start 之后 gen3 已过期
        worker.set_generation(5);
        dispatch_eventually(&worker, tagged(5, 0.5));

        let mut generations = Vec::new();
        while generations.last() != Some(&5) {
            let reply = worker
                .receiver()
                .recv_timeout(Duration::from_secs(5))
                .unwrap();
            generations.push(reply.generation);
        }
        assert_eq!(generations, vec![1, 5]);
        assert_eq!(*transport.thresholds.lock().unwrap(), vec![0.1, 0.5]);
    }
}
