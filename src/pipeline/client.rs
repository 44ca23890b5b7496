// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 推理客户端 (Inference Client)
/// 职责: ImageBlob + 阈值 → POST /predict (multipart) → 解析检测结果
///       GET /health → 后端就绪状态
use crate::detection::{Detection, InferenceResponse};
use crate::error::InferenceError;
use crate::pipeline::sampler::ImageBlob;
use std::time::Duration;

/// 推理请求默认超时 (防止后端卡死导致单飞锁永久占用)
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// 推理传输接口
pub trait InferenceTransport: Send + Sync {
    fn predict(&self, image: &ImageBlob, threshold: f32)
        -> Result<InferenceResponse, InferenceError>;
}

/// 健康检查结果
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HealthOutcome {
    /// `{"status": "ready"}`
    Ready,
    /// 可达但尚未就绪
    NotReady,
    /// 网络失败
    Unreachable,
}

/// 健康检查接口
pub trait HealthProbe: Send + Sync {
    fn health(&self) -> HealthOutcome;
}

/// HTTP推理客户端 (ureq)
pub struct HttpInferenceClient {
    agent: ureq::Agent,
    predict_url: String,
    health_url: String,
}

impl HttpInferenceClient {
    pub fn new(api_url: &str, timeout: Duration) -> Self {
        let base = api_url.trim_end_matches('/');
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            predict_url: format!("{}/predict", base),
            health_url: format!("{}/health", base),
        }
    }
}

impl InferenceTransport for HttpInferenceClient {
    fn predict(
        &self,
        image: &ImageBlob,
        threshold: f32,
    ) -> Result<InferenceResponse, InferenceError> {
        let mut form = MultipartForm::new();
        form.add_file("file", ImageBlob::FILE_NAME, ImageBlob::MIME, &image.bytes);
        form.add_text("threshold", &threshold.to_string());

        let content_type = form.content_type();
        let response = self
            .agent
            .post(&self.predict_url)
            .set("Content-Type", &content_type)
            .send_bytes(&form.finish())
            .map_err(map_ureq_error)?;

        let body = response
            .into_string()
            .map_err(|e| InferenceError::Transport(e.to_string()))?;
        parse_predict_body(&body)
    }
}

impl HealthProbe for HttpInferenceClient {
    fn health(&self) -> HealthOutcome {
        match self.agent.get(&self.health_url).call() {
            Ok(response) => match response.into_string() {
                Ok(body) => parse_health_body(&body),
                Err(_) => HealthOutcome::Unreachable,
            },
            // 错误码同样按响应体判断: JSON 视为未就绪, 否则视为离线
            Err(ureq::Error::Status(_, response)) => match response.into_string() {
                Ok(body) => parse_health_body(&body),
                Err(_) => HealthOutcome::Unreachable,
            },
            Err(ureq::Error::Transport(_)) => HealthOutcome::Unreachable,
        }
    }
}

fn map_ureq_error(err: ureq::Error) -> InferenceError {
    match err {
        ureq::Error::Status(code, _) => InferenceError::Status(code),
        ureq::Error::Transport(t) => InferenceError::Transport(t.to_string()),
    }
}

/// 解析 `/predict` 响应
///
/// 非JSON → 错误; `detections` 缺失或格式错误 → `detections: None`
pub fn parse_predict_body(body: &str) -> Result<InferenceResponse, InferenceError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| InferenceError::Body(e.to_string()))?;

    let detections = value
        .get("detections")
        .cloned()
        .and_then(|d| serde_json::from_value::<Vec<Detection>>(d).ok());

    Ok(InferenceResponse { detections })
}

/// 解析 `/health` 响应, 只有 `status == "ready"` 视为就绪
pub fn parse_health_body(body: &str) -> HealthOutcome {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => {
            if value.get("status").and_then(|s| s.as_str()) == Some("ready") {
                HealthOutcome::Ready
            } else {
                HealthOutcome::NotReady
            }
        }
        Err(_) => HealthOutcome::Unreachable,
    }
}

/// multipart/form-data 请求体
pub struct MultipartForm {
    boundary: String,
    body: Vec<u8>,
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartForm {
    pub fn new() -> Self {
        Self {
            boundary: format!("----VisionXBoundary{:016x}", rand::random::<u64>()),
            body: Vec::new(),
        }
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn add_text(&mut self, name: &str, value: &str) {
        self.body
            .extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
        self.body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        self.body.extend_from_slice(value.as_bytes());
        self.body.extend_from_slice(b"\r\n");
    }

    pub fn add_file(&mut self, name: &str, file_name: &str, mime: &str, bytes: &[u8]) {
        self.body
            .extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
        self.body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                name, file_name
            )
            .as_bytes(),
        );
        self.body
            .extend_from_slice(format!("Content-Type: {}\r\n\r\n", mime).as_bytes());
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        self.body
    }
}
