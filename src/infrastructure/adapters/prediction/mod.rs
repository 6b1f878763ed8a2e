//! Prediction Adapter - HTTP 预测客户端实现

mod fake_prediction_client;
mod http_prediction_client;

pub use fake_prediction_client::{FakePredictionClient, FakeReply};
pub use http_prediction_client::*;
