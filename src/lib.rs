// 图书封面图片后端库
//
// 本库提供封面图片地址提取服务的核心功能，包括：
// - API 路由
// - 目标 URL 校验
// - 页面抓取与图片提取
// - 两级缓存（Redis + 文件）
// - 配置与日志

pub mod api;
pub mod config;
pub mod logging;
pub mod models;
pub mod services;
