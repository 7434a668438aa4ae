// src/bidding/transport.rs

use serde_json::json;

use crate::error::SspError;
use crate::model::partner::{Partner, TransportKind};
use crate::openrtb::request::BidRequest;
use crate::openrtb::response::BidResponse;

/// partner 应答的三种解码结果。
/// 超时/取消由 dispatcher 在传输层之外单独判定，是第四种结局。
#[derive(Debug)]
pub enum Decoded {
    Bid(BidResponse),
    NoBid,
    Error(String),
}

/// 出站传输通道的能力集：编码、请求头、解码、应答变换。
///
/// dispatcher 对通道类型不感知，per-flavor 的分支全部收在各实现里。
pub trait PartnerTransport: Send + Sync {
    fn encode(&self, request: &BidRequest) -> Result<Vec<u8>, SspError>;
    fn headers(&self) -> Vec<(&'static str, String)>;
    fn decode(&self, status: u16, body: &[u8]) -> Decoded;
    /// 应答交给竞价引擎之前的钩子（whitelabel 在这里扣 SSP 分成）
    fn transform_response(&self, response: BidResponse) -> BidResponse {
        response
    }
}

pub fn transport_for(partner: &Partner, ssp_id: &str) -> Box<dyn PartnerTransport> {
    match partner.transport {
        TransportKind::Openrtb => Box::new(OpenrtbTransport {
            api_key: partner.api_key.clone(),
        }),
        TransportKind::Whitelabel => Box::new(WhitelabelTransport {
            api_key: partner.api_key.clone(),
            ssp_id: ssp_id.to_string(),
            ssp_share: partner.rev_share,
        }),
        TransportKind::LegacyAdx => Box::new(LegacyAdxTransport {
            api_key: partner.api_key.clone(),
        }),
    }
}

fn encode_json(request: &BidRequest) -> Result<Vec<u8>, SspError> {
    serde_json::to_vec(request).map_err(|e| SspError::Internal(format!("encode bid request: {}", e)))
}

/// HTTP 204 = 明确 no-bid；200 + 合法 JSON = 出价；其余一律视为错误。
fn decode_json(status: u16, body: &[u8]) -> Decoded {
    match status {
        204 => Decoded::NoBid,
        200 => match serde_json::from_slice::<BidResponse>(body) {
            Ok(response) => Decoded::Bid(response),
            Err(e) => Decoded::Error(format!("json_parse_error: {}", e)),
        },
        other => Decoded::Error(format!("unexpected status: {}", other)),
    }
}

/// 标准 OpenRTB 通道（直连 DSP）
pub struct OpenrtbTransport {
    api_key: Option<String>,
}

impl PartnerTransport for OpenrtbTransport {
    fn encode(&self, request: &BidRequest) -> Result<Vec<u8>, SspError> {
        encode_json(request)
    }

    fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            ("Content-Type", "application/json".to_string()),
            ("X-OpenRTB-Version", "2.5".to_string()),
        ];
        if let Some(key) = &self.api_key {
            headers.push(("Authorization", format!("Bearer {}", key)));
        }
        headers
    }

    fn decode(&self, status: u16, body: &[u8]) -> Decoded {
        decode_json(status, body)
    }
}

/// Whitelabel 通道：请求注入 SSP 标识扩展，应答按 SSP 分成压价。
/// 这是整个 SSP 里唯一一处对 bid.price 的改写。
pub struct WhitelabelTransport {
    api_key: Option<String>,
    ssp_id: String,
    ssp_share: f64,
}

impl PartnerTransport for WhitelabelTransport {
    fn encode(&self, request: &BidRequest) -> Result<Vec<u8>, SspError> {
        let mut request = request.clone();
        request.ext = Some(json!({
            "ssp": self.ssp_id,
            "integration": format!("{}-wl", self.ssp_id),
            "version": "1.0.0",
        }));
        encode_json(&request)
    }

    fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            ("Content-Type", "application/json".to_string()),
            ("X-OpenRTB-Version", "2.5".to_string()),
        ];
        if let Some(key) = &self.api_key {
            headers.push(("X-API-Key", key.clone()));
        }
        headers
    }

    fn decode(&self, status: u16, body: &[u8]) -> Decoded {
        decode_json(status, body)
    }

    fn transform_response(&self, mut response: BidResponse) -> BidResponse {
        for seatbid in &mut response.seatbid {
            for bid in &mut seatbid.bid {
                bid.price *= 1.0 - self.ssp_share;
            }
        }
        response
    }
}

/// 旧版 ADX 通道，只有鉴权头不同
pub struct LegacyAdxTransport {
    api_key: Option<String>,
}

impl PartnerTransport for LegacyAdxTransport {
    fn encode(&self, request: &BidRequest) -> Result<Vec<u8>, SspError> {
        encode_json(request)
    }

    fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            ("Content-Type", "application/json".to_string()),
            ("X-OpenRTB-Version", "2.5".to_string()),
        ];
        if let Some(key) = &self.api_key {
            headers.push(("X-EXADS-API-Key", key.clone()));
        }
        headers
    }

    fn decode(&self, status: u16, body: &[u8]) -> Decoded {
        decode_json(status, body)
    }
}
