use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// **Top-level OpenRTB 2.5 Bid Request**
///
/// 所有 Option 字段在未设置时不落盘（不会序列化为 null），
/// 保证发往 DSP 的请求与 OpenRTB 规范字节级一致。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct BidRequest {
    pub id: String,                 // 请求 ID，每个竞价请求唯一
    pub imp: Vec<Imp>,              // 广告展示请求（Impression）列表
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<Site>,         // 网站信息（请求来源是 Web/CTV 时）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app: Option<App>,           // 应用信息（请求来源是 App 时）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<Device>,     // 设备信息（UA、IP、IFA）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,         // 用户信息
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test: Option<i32>,          // 是否是测试请求（1 = 测试模式）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at: Option<i32>,            // 竞价模式（1 = 第一价格, 2 = 第二价格）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmax: Option<u64>,          // 竞价超时时间（毫秒）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cur: Option<Vec<String>>,   // 允许的货币（如 USD）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bcat: Option<Vec<String>>,  // 屏蔽的广告类别（IAB 分类）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badv: Option<Vec<String>>,  // 屏蔽的广告主域名
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,     // 竞价请求来源信息（含 schain）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regs: Option<Regs>,         // 隐私法规信息（如 GDPR、COPPA）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ext: Option<Value>,         // 扩展字段（whitelabel 通道注入 SSP 标识）
}

/// **Impression（广告展示请求）**
///
/// banner / video / audio / native 四者有且仅有一个被设置，
/// 由广告位的 ad_type 决定。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Imp {
    pub id: String,                  // 展示请求 ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<Banner>,      // Banner 广告信息
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<Video>,        // 视频广告信息
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<Audio>,        // 音频广告信息
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native: Option<Native>,      // 原生广告信息
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pmp: Option<Pmp>,            // 私有交易市场信息（PMP deal）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tagid: Option<String>,       // 广告位在 SSP 系统中的标识符
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bidfloor: Option<f64>,       // 底价（USD CPM）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bidfloorcur: Option<String>, // 底价货币类型
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secure: Option<i32>,         // 1 = 要求 HTTPS 创意
}

/// **Banner（横幅广告）**
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Banner {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<Vec<Format>>, // 允许的广告格式（多尺寸）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub w: Option<i32>,              // 宽度（像素）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub h: Option<i32>,              // 高度（像素）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos: Option<i32>,            // 广告位置（1 = 首屏）
}

/// **Video（视频广告）**
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Video {
    pub mimes: Vec<String>,          // 支持的视频格式（如 video/mp4）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minduration: Option<i32>,    // 最短持续时间（秒）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maxduration: Option<i32>,    // 最长持续时间（秒）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocols: Option<Vec<i32>>, // 支持的 VAST 协议代码
    #[serde(skip_serializing_if = "Option::is_none")]
    pub w: Option<i32>,              // 视频宽度（像素）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub h: Option<i32>,              // 视频高度（像素）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub startdelay: Option<i32>,     // 播放延迟（-1 = 中贴, 0 = 前贴）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linearity: Option<i32>,      // 1 = 线性, 2 = 非线性
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playbackmethod: Option<Vec<i32>>, // 播放触发方式代码
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<Vec<i32>>,       // 支持的 API 框架代码
}

/// **Audio（音频广告）**
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Audio {
    pub mimes: Vec<String>,          // 支持的音频格式（如 audio/mp3）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minduration: Option<i32>,    // 最短播放时长（秒）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maxduration: Option<i32>,    // 最长播放时长（秒）
}

/// **Native（原生广告）**
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Native {
    pub request: String,             // 原生广告请求 JSON
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ver: Option<String>,         // Native 规范版本
}

/// **Format（尺寸）**
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Format {
    pub w: i32, // 宽度（像素）
    pub h: i32, // 高度（像素）
}

/// **PMP（私有交易市场）**
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Pmp {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_auction: Option<i32>, // 1 = 仅限私有竞价
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deals: Option<Vec<PmpDeal>>,  // 允许的交易
}

/// **PMP 交易条目**
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct PmpDeal {
    pub id: String,                   // 交易 ID（dealid）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bidfloor: Option<f64>,        // 交易底价（USD CPM）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bidfloorcur: Option<String>,  // 底价货币
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at: Option<i32>,              // 交易内竞价模式
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wseat: Option<Vec<String>>,   // 允许的买方席位
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wadomain: Option<Vec<String>>, // 允许的广告主域名
}

/// **网站信息**
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Site {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,             // 网站 ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,           // 网站名称
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,         // 网站域名
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cat: Option<Vec<String>>,       // IAB 内容分类
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,           // 当前页面 URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#ref: Option<String>,          // Referer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<SitePublisher>, // 发布者信息
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,       // CTV 内容元数据
}

/// **发布者信息（站点视角）**
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct SitePublisher {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

/// **内容元数据（CTV/SSAI 场景）**
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,             // 内容 ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,          // 内容类型
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contentrating: Option<String>,  // 内容分级
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,       // 内容语言
}

/// **App 信息**
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct App {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle: Option<String>,
}

/// **设备信息**
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Device {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ua: Option<String>,         // User-Agent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,         // 设备 IP 地址
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ifa: Option<String>,        // 广告标识符（CTV/SSAI 场景）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub devicetype: Option<i32>,    // OpenRTB 设备类型代码
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo: Option<Geo>,           // 地理位置
}

/// **地理位置**
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Geo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,    // ISO-3166-1 Alpha-3
}

/// **用户信息**
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct User {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// **Source（请求来源）**
///
/// `ext.schain` 承载供应链对象，嵌入时保留 ext 中已有的其它键。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Source {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fd: Option<i32>,            // 1 = 最终销售方
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tid: Option<String>,        // 交易 ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ext: Option<Map<String, Value>>, // 扩展（schain 等）
}

/// **Regs（隐私法规）**
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Regs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coppa: Option<i32>,         // 1 = 适用 COPPA
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gdpr: Option<i32>,          // 1 = 适用 GDPR
}
