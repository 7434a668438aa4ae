use serde::{Deserialize, Serialize};

/// OpenRTB 2.5 Bid Response
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct BidResponse {
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub seatbid: Vec<SeatBid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bidid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cur: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbr: Option<i32>, // no-bid 原因代码
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct SeatBid {
    pub bid: Vec<Bid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seat: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<i32>,
}

/// 单条出价
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Bid {
    pub id: String,
    pub impid: String,
    pub price: f64,                 // 出价（USD CPM）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nurl: Option<String>,       // 获胜通知 URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub burl: Option<String>,       // 计费通知 URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adm: Option<String>,        // 广告创意（HTML / VAST / Native JSON）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adomain: Option<Vec<String>>, // 广告主域名
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,        // Campaign ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crid: Option<String>,       // Creative ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cat: Option<Vec<String>>,   // 创意的 IAB 分类
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dealid: Option<String>,     // PMP 交易 ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub w: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub h: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i32>,           // 出价有效期（秒）
}
