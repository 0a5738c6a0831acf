//! 数据模型模块

pub mod audit;
pub mod device;
pub mod unlock;
