//! # Value 模块
//!
//! 着色器参数的类型化取值，以及效果混合时使用的插值规则。
//!
//! ## 插值规则
//!
//! | from / to | 行为 |
//! |-----------|------|
//! | 同类型 float/int/vec/color | 分量线性插值 |
//! | bool | 跳变：`t > 0.5` 取 `to`，否则 `from` |
//! | 类型不一致 | 跳变（同 bool） |
//!
//! 类型不一致不是错误，而是有定义的跳变行为。

use serde::{Deserialize, Serialize};

/// 跳变插值的阈值
pub const SNAP_THRESHOLD: f32 = 0.5;

/// 参数值类型标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Float,
    Int,
    Vec2,
    Vec3,
    Vec4,
    Color,
    Bool,
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Float => "float",
            Self::Int => "int",
            Self::Vec2 => "vec2",
            Self::Vec3 => "vec3",
            Self::Vec4 => "vec4",
            Self::Color => "color",
            Self::Bool => "bool",
        };
        f.write_str(name)
    }
}

/// 着色器参数值
///
/// 封闭的取值集合。JSON 形式为外部标签，例如 `{"float": 0.4}`、
/// `{"color": [1.0, 0.2, 0.1, 1.0]}`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamValue {
    /// 浮点数
    Float(f32),
    /// 整数
    Int(i32),
    /// 2D 向量
    Vec2([f32; 2]),
    /// 3D 向量
    Vec3([f32; 3]),
    /// 4D 向量
    Vec4([f32; 4]),
    /// RGBA 颜色（每通道 0.0 - 1.0）
    Color([f32; 4]),
    /// 布尔值
    Bool(bool),
}

impl ParamValue {
    /// 不透明颜色
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::Color([r, g, b, 1.0])
    }

    /// 带 alpha 的颜色
    pub fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self::Color([r, g, b, a])
    }

    /// 类型标签
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Float(_) => ValueKind::Float,
            Self::Int(_) => ValueKind::Int,
            Self::Vec2(_) => ValueKind::Vec2,
            Self::Vec3(_) => ValueKind::Vec3,
            Self::Vec4(_) => ValueKind::Vec4,
            Self::Color(_) => ValueKind::Color,
            Self::Bool(_) => ValueKind::Bool,
        }
    }

    /// 与 `self` 同类型的零值
    ///
    /// 原生存储里没有该参数时，用作基准值。
    pub fn zero_like(&self) -> Self {
        match self {
            Self::Float(_) => Self::Float(0.0),
            Self::Int(_) => Self::Int(0),
            Self::Vec2(_) => Self::Vec2([0.0; 2]),
            Self::Vec3(_) => Self::Vec3([0.0; 3]),
            Self::Vec4(_) => Self::Vec4([0.0; 4]),
            Self::Color(_) => Self::Color([0.0; 4]),
            Self::Bool(_) => Self::Bool(false),
        }
    }

    /// 从 `self` 向 `to` 插值，等价于 [`interpolate`]
    pub fn lerp(&self, to: &ParamValue, t: f32) -> ParamValue {
        interpolate(self, to, t)
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<f32> for ParamValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

/// 浮点字面量默认推断为 f64，这里收窄为 f32
impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v as f32)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<[f32; 2]> for ParamValue {
    fn from(v: [f32; 2]) -> Self {
        Self::Vec2(v)
    }
}

impl From<[f32; 3]> for ParamValue {
    fn from(v: [f32; 3]) -> Self {
        Self::Vec3(v)
    }
}

/// `[f32; 4]` 视为 vec4；颜色请用 [`ParamValue::rgba`]
impl From<[f32; 4]> for ParamValue {
    fn from(v: [f32; 4]) -> Self {
        Self::Vec4(v)
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prec = f.precision().unwrap_or(3);
        let join = |f: &mut std::fmt::Formatter<'_>, xs: &[f32]| -> std::fmt::Result {
            for (i, x) in xs.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{:.*}", prec, x)?;
            }
            Ok(())
        };

        match self {
            Self::Float(v) => write!(f, "{:.*}", prec, v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Vec2(v) => {
                f.write_str("(")?;
                join(f, v)?;
                f.write_str(")")
            }
            Self::Vec3(v) => {
                f.write_str("(")?;
                join(f, v)?;
                f.write_str(")")
            }
            Self::Vec4(v) => {
                f.write_str("(")?;
                join(f, v)?;
                f.write_str(")")
            }
            Self::Color(v) => {
                f.write_str("rgba(")?;
                join(f, v)?;
                f.write_str(")")
            }
        }
    }
}

fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn lerp_array<const N: usize>(a: &[f32; N], b: &[f32; N], t: f32) -> [f32; N] {
    std::array::from_fn(|i| lerp_f32(a[i], b[i], t))
}

fn snap(from: &ParamValue, to: &ParamValue, t: f32) -> ParamValue {
    if t > SNAP_THRESHOLD {
        to.clone()
    } else {
        from.clone()
    }
}

/// 在两个参数值之间插值
///
/// - `t <= 0` 返回 `from`，`t >= 1` 返回 `to`
/// - 同类型数值/向量/颜色：分量线性插值；int 在 f32 中插值后向零截断
/// - bool 或类型不一致：跳变
pub fn interpolate(from: &ParamValue, to: &ParamValue, t: f32) -> ParamValue {
    if t >= 1.0 {
        return to.clone();
    }
    if t <= 0.0 {
        return from.clone();
    }

    use ParamValue::*;
    match (from, to) {
        (Float(a), Float(b)) => Float(lerp_f32(*a, *b, t)),
        (Int(a), Int(b)) => Int(lerp_f32(*a as f32, *b as f32, t) as i32),
        (Vec2(a), Vec2(b)) => Vec2(lerp_array(a, b, t)),
        (Vec3(a), Vec3(b)) => Vec3(lerp_array(a, b, t)),
        (Vec4(a), Vec4(b)) => Vec4(lerp_array(a, b, t)),
        (Color(a), Color(b)) => Color(lerp_array(a, b, t)),
        _ => snap(from, to, t),
    }
}
