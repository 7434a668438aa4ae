// src/render/vast.rs

use crate::openrtb::response::Bid;

/// 从创意标记里提取 `<Duration>HH:MM:SS</Duration>`，取不到时回落 30 秒
pub fn parse_duration_secs(adm: &str) -> Option<i32> {
    let start = adm.find("<Duration>")? + "<Duration>".len();
    let end = adm[start..].find("</Duration>")? + start;
    let mut parts = adm[start..end].trim().splitn(3, ':');
    let hours: i32 = parts.next()?.parse().ok()?;
    let minutes: i32 = parts.next()?.parse().ok()?;
    let seconds: i32 = parts.next()?.parse().ok()?;
    Some(hours * 3600 + minutes * 60 + seconds)
}

pub fn bid_duration_secs(bid: &Bid) -> i32 {
    bid.adm
        .as_deref()
        .and_then(parse_duration_secs)
        .unwrap_or(30)
}

fn format_duration(secs: i32) -> String {
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// 获胜出价 → VAST 3.0 文档。
///
/// 创意本身已是 VAST 时原样透传；否则包一层单线性创意，
/// quartile 打点全部指向 SSP 公网地址下的 pixel 端点。
pub fn render_vast(bid: &Bid, origin: &str, ad_system: &str) -> String {
    let adm = bid.adm.as_deref().unwrap_or("");
    if adm.contains("<VAST") {
        return adm.to_string();
    }

    let duration = format_duration(bid_duration_secs(bid));
    let pixel = |event: &str| format!("{}/publica/pixel/{}?bid={}", origin, event, bid.id);

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<VAST version="3.0">
  <Ad id="{bid_id}">
    <InLine>
      <AdSystem>{ad_system}</AdSystem>
      <AdTitle>Video Ad</AdTitle>
      <Impression><![CDATA[{origin}/impression/{bid_id}]]></Impression>
      <Creatives>
        <Creative>
          <Linear>
            <Duration>{duration}</Duration>
            <MediaFiles>
              <MediaFile delivery="progressive" type="video/mp4" width="{w}" height="{h}">
                <![CDATA[{media_url}]]>
              </MediaFile>
            </MediaFiles>
            <VideoClicks>
              <ClickThrough><![CDATA[{origin}/click/{bid_id}]]></ClickThrough>
            </VideoClicks>
            <TrackingEvents>
              <Tracking event="start"><![CDATA[{start}]]></Tracking>
              <Tracking event="firstQuartile"><![CDATA[{q1}]]></Tracking>
              <Tracking event="midpoint"><![CDATA[{q2}]]></Tracking>
              <Tracking event="thirdQuartile"><![CDATA[{q3}]]></Tracking>
              <Tracking event="complete"><![CDATA[{complete}]]></Tracking>
            </TrackingEvents>
          </Linear>
        </Creative>
      </Creatives>
    </InLine>
  </Ad>
</VAST>"#,
        bid_id = bid.id,
        ad_system = ad_system,
        origin = origin,
        duration = duration,
        w = bid.w.unwrap_or(1920),
        h = bid.h.unwrap_or(1080),
        media_url = adm,
        start = pixel("start"),
        q1 = pixel("q1"),
        q2 = pixel("q2"),
        q3 = pixel("q3"),
        complete = pixel("complete"),
    )
}

/// 无填充时的空广告文档
pub fn empty_vast(ad_system: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<VAST version="3.0">
  <Ad id="empty">
    <InLine>
      <AdSystem>{}</AdSystem>
      <AdTitle>No Ad Available</AdTitle>
      <Creatives></Creatives>
    </InLine>
  </Ad>
</VAST>"#,
        ad_system
    )
}
