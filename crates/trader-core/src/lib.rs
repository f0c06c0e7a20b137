//! 백테스트 파이프라인 공용 도메인.
//!
//! # 구성
//!
//! - [`types`]: 캔들, 타임프레임, 잡 레코드, AI 설정/요약
//! - [`domain`]: 외부 협력자 trait (캔들 제공자, 저장소, 전략 엔진)
//! - [`indicators`]: 볼륨 프로파일 (결정적 레인지 계산)

pub mod domain;
pub mod indicators;
pub mod text;
pub mod types;

pub use domain::*;
pub use types::*;
