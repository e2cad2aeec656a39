//! 적용 중인 설정 출력.

use propdash_core::AppConfig;

use crate::error::Result;

/// 설정을 TOML 문자열로 렌더링합니다.
pub fn render_config(config: &AppConfig) -> Result<String> {
    Ok(toml::to_string_pretty(config)?)
}
