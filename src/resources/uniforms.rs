//! Uniform declarations and per-pass schemas
//!
//! A pass declares its uniforms as a list of [`UniformDeclaration`]s. The
//! graph builder resolves each declaration into a typed [`UniformSlot`] and
//! collects them in a [`UniformSchema`], which the renderer mutates every tick
//! and the device backend packs into a uniform buffer.
//!
//! Value slots are packed with a fixed 16-byte stride so the WGSL struct
//! generated for a pass can give every member `@align(16)` and stay in sync
//! with [`UniformSchema::pack_values`] regardless of member kinds.

use glam::{Vec2, Vec3, Vec4};
use serde::Deserialize;

use super::texture::TextureBinding;
use crate::errors::{HorizonError, Result};

/// Byte stride of one value slot in a packed uniform buffer.
pub const UNIFORM_SLOT_STRIDE: usize = 16;

/// Names the renderer writes automatically when a pass declares them.
pub mod builtin {
    pub const TIME: &str = "uTime";
    pub const RESOLUTION: &str = "uResolution";
    pub const INPUT_TEXTURE: &str = "uInputTexture";
    pub const CAMERA_POSITION: &str = "uCameraPosition";
    pub const CAMERA_ROTATION: &str = "uCameraRotation";
}

/// The shader-side type of a uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UniformKind {
    Float,
    Int,
    Bool,
    Vec2,
    Vec3,
    Vec4,
    Texture,
}

impl UniformKind {
    /// WGSL spelling of the member type inside the generated uniform struct.
    ///
    /// Booleans are not host-shareable in WGSL and travel as `u32`.
    #[must_use]
    pub fn wgsl_type(self) -> &'static str {
        match self {
            Self::Float => "f32",
            Self::Int => "i32",
            Self::Bool => "u32",
            Self::Vec2 => "vec2<f32>",
            Self::Vec3 => "vec3<f32>",
            Self::Vec4 => "vec4<f32>",
            Self::Texture => "texture_2d<f32>",
        }
    }

    #[inline]
    #[must_use]
    pub fn is_texture(self) -> bool {
        matches!(self, Self::Texture)
    }

    fn of_builtin(name: &str) -> Option<Self> {
        match name {
            builtin::TIME => Some(Self::Float),
            builtin::RESOLUTION => Some(Self::Vec2),
            builtin::INPUT_TEXTURE => Some(Self::Texture),
            builtin::CAMERA_POSITION | builtin::CAMERA_ROTATION => Some(Self::Vec3),
            _ => None,
        }
    }
}

/// A concrete uniform value.
///
/// Deserialization accepts plain JSON: booleans, numbers, and 2/3/4-element
/// number arrays. Integers arrive as [`UniformValue::Float`] and are coerced
/// once the declared kind is known.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum UniformValue {
    Bool(bool),
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    #[serde(skip)]
    Int(i32),
    #[serde(skip)]
    Texture(TextureBinding),
}

impl UniformValue {
    #[must_use]
    pub fn kind(&self) -> UniformKind {
        match self {
            Self::Bool(_) => UniformKind::Bool,
            Self::Float(_) => UniformKind::Float,
            Self::Int(_) => UniformKind::Int,
            Self::Vec2(_) => UniformKind::Vec2,
            Self::Vec3(_) => UniformKind::Vec3,
            Self::Vec4(_) => UniformKind::Vec4,
            Self::Texture(_) => UniformKind::Texture,
        }
    }

    /// Converts the value to `kind` when the conversion is lossless.
    #[must_use]
    pub fn coerce(self, kind: UniformKind) -> Option<Self> {
        match (self, kind) {
            (value, kind) if value.kind() == kind => Some(value),
            (Self::Float(v), UniformKind::Int) if v.fract() == 0.0 => Some(Self::Int(v as i32)),
            (Self::Int(v), UniformKind::Float) => Some(Self::Float(v as f32)),
            _ => None,
        }
    }

    /// Writes the value into one 16-byte slot as raw 32-bit words.
    fn write_words(&self, words: &mut [u32; 4]) {
        match *self {
            Self::Float(v) => words[0] = v.to_bits(),
            Self::Int(v) => words[0] = v.cast_unsigned(),
            Self::Bool(v) => words[0] = u32::from(v),
            Self::Vec2(v) => {
                for (w, c) in words.iter_mut().zip(v.to_array()) {
                    *w = c.to_bits();
                }
            }
            Self::Vec3(v) => {
                for (w, c) in words.iter_mut().zip(v.to_array()) {
                    *w = c.to_bits();
                }
            }
            Self::Vec4(v) => {
                for (w, c) in words.iter_mut().zip(v.to_array()) {
                    *w = c.to_bits();
                }
            }
            Self::Texture(_) => {}
        }
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for UniformValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        Self::Vec2(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        Self::Vec3(v)
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        Self::Vec4(v)
    }
}

impl From<TextureBinding> for UniformValue {
    fn from(v: TextureBinding) -> Self {
        Self::Texture(v)
    }
}

/// A uniform as written in a pass declaration.
///
/// `kind` may be omitted when it can be inferred from `value` or when the
/// name is one of the [`builtin`] names.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UniformDeclaration {
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: Option<UniformKind>,
    #[serde(default)]
    pub value: Option<UniformValue>,
}

impl UniformDeclaration {
    /// A declaration with an explicit kind and no initial value.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: UniformKind) -> Self {
        Self {
            name: name.into(),
            kind: Some(kind),
            value: None,
        }
    }

    /// A declaration whose kind is inferred from its initial value.
    #[must_use]
    pub fn with_value(name: impl Into<String>, value: impl Into<UniformValue>) -> Self {
        Self {
            name: name.into(),
            kind: None,
            value: Some(value.into()),
        }
    }

    /// A declaration of a builtin name (`uTime`, `uResolution`, ...).
    #[must_use]
    pub fn builtin(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: None,
            value: None,
        }
    }

    fn resolve(&self, pass: &str) -> Result<UniformSlot> {
        if !is_identifier(&self.name) {
            return Err(HorizonError::config(format!(
                "pass '{pass}': uniform name '{}' is not a valid identifier",
                self.name
            )));
        }

        let kind = self
            .kind
            .or_else(|| self.value.map(|v| v.kind()))
            .or_else(|| UniformKind::of_builtin(&self.name))
            .ok_or_else(|| {
                HorizonError::config(format!(
                    "pass '{pass}': cannot infer the type of uniform '{}'",
                    self.name
                ))
            })?;

        if let Some(expected) = UniformKind::of_builtin(&self.name)
            && expected != kind
        {
            return Err(HorizonError::config(format!(
                "pass '{pass}': uniform '{}' must be {expected:?}, declared as {kind:?}",
                self.name
            )));
        }

        let value = match self.value {
            Some(value) => Some(value.coerce(kind).ok_or_else(|| {
                HorizonError::config(format!(
                    "pass '{pass}': value of uniform '{}' does not match declared type {kind:?}",
                    self.name
                ))
            })?),
            None => None,
        };

        Ok(UniformSlot {
            name: self.name.clone(),
            kind,
            value,
        })
    }
}

/// A resolved, typed uniform of a pass.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformSlot {
    pub name: String,
    pub kind: UniformKind,
    pub value: Option<UniformValue>,
}

/// Slot indices of the builtin uniforms a pass declared.
///
/// Resolved once when the schema is built so the per-tick update never
/// searches by name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuiltinSlots {
    pub time: Option<usize>,
    pub resolution: Option<usize>,
    pub input_texture: Option<usize>,
    pub camera_position: Option<usize>,
    pub camera_rotation: Option<usize>,
}

/// The ordered uniform set of one pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniformSchema {
    slots: Vec<UniformSlot>,
    builtins: BuiltinSlots,
}

impl UniformSchema {
    /// Resolves declarations into typed slots.
    ///
    /// Fails with a configuration error on invalid or duplicate names, on
    /// uninferable kinds, and on values that do not fit the declared kind.
    pub fn from_declarations(pass: &str, declarations: &[UniformDeclaration]) -> Result<Self> {
        let mut schema = Self::default();
        for declaration in declarations {
            let slot = declaration.resolve(pass)?;
            schema.push(pass, slot)?;
        }
        Ok(schema)
    }

    /// Appends a slot, keeping builtin indices current.
    pub(crate) fn push(&mut self, pass: &str, slot: UniformSlot) -> Result<usize> {
        if self.index_of(&slot.name).is_some() {
            return Err(HorizonError::config(format!(
                "pass '{pass}': uniform '{}' is declared twice",
                slot.name
            )));
        }
        let index = self.slots.len();
        match slot.name.as_str() {
            builtin::TIME => self.builtins.time = Some(index),
            builtin::RESOLUTION => self.builtins.resolution = Some(index),
            builtin::INPUT_TEXTURE => self.builtins.input_texture = Some(index),
            builtin::CAMERA_POSITION => self.builtins.camera_position = Some(index),
            builtin::CAMERA_ROTATION => self.builtins.camera_rotation = Some(index),
            _ => {}
        }
        self.slots.push(slot);
        Ok(index)
    }

    #[inline]
    #[must_use]
    pub fn slots(&self) -> &[UniformSlot] {
        &self.slots
    }

    #[inline]
    #[must_use]
    pub fn builtins(&self) -> BuiltinSlots {
        self.builtins
    }

    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.name == name)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&UniformSlot> {
        self.slots.iter().find(|s| s.name == name)
    }

    #[must_use]
    pub fn value(&self, name: &str) -> Option<UniformValue> {
        self.get(name).and_then(|s| s.value)
    }

    /// Writes a value into the slot at `index`, coercing it to the slot's kind.
    pub fn set(&mut self, index: usize, value: impl Into<UniformValue>) -> Result<()> {
        let value = value.into();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or_else(|| HorizonError::config(format!("uniform slot {index} out of range")))?;
        let coerced = value.coerce(slot.kind).ok_or_else(|| {
            HorizonError::config(format!(
                "uniform '{}' is {:?}, cannot assign {:?}",
                slot.name,
                slot.kind,
                value.kind()
            ))
        })?;
        slot.value = Some(coerced);
        Ok(())
    }

    /// Writes a value by name.
    pub fn set_by_name(&mut self, name: &str, value: impl Into<UniformValue>) -> Result<()> {
        let index = self
            .index_of(name)
            .ok_or_else(|| HorizonError::config(format!("no uniform named '{name}'")))?;
        self.set(index, value)
    }

    /// Non-texture slots, in declaration order.
    pub fn value_slots(&self) -> impl Iterator<Item = &UniformSlot> {
        self.slots.iter().filter(|s| !s.kind.is_texture())
    }

    /// Texture slots, in declaration order.
    pub fn texture_slots(&self) -> impl Iterator<Item = &UniformSlot> {
        self.slots.iter().filter(|s| s.kind.is_texture())
    }

    /// Current texture bindings in texture-slot order. Unbound slots are `None`.
    pub fn texture_bindings(&self) -> impl Iterator<Item = Option<TextureBinding>> + '_ {
        self.texture_slots().map(|s| match s.value {
            Some(UniformValue::Texture(binding)) => Some(binding),
            _ => None,
        })
    }

    /// Size in bytes of the packed value block. Never zero.
    #[must_use]
    pub fn packed_size(&self) -> usize {
        self.value_slots().count().max(1) * UNIFORM_SLOT_STRIDE
    }

    /// Packs every value slot into 16-byte words. Unset slots pack as zero.
    #[must_use]
    pub fn pack_values(&self) -> Vec<u8> {
        let mut words: Vec<[u32; 4]> = vec![[0; 4]; self.packed_size() / UNIFORM_SLOT_STRIDE];
        for (slot, out) in self.value_slots().zip(words.iter_mut()) {
            if let Some(value) = &slot.value {
                value.write_words(out);
            }
        }
        bytemuck::cast_slice(&words).to_vec()
    }
}

/// Names the generated interface declares itself.
const INTERFACE_NAMES: &[&str] = &[
    "uniforms",
    "linear_sampler",
    "in",
    "out",
    "VertexOutput",
    "PassUniforms",
    "vs_main",
    "fs_main",
];

/// Predeclared types the generated interface spells out.
const PREDECLARED_TYPES: &[&str] = &[
    "bool", "f32", "i32", "u32", "vec2", "vec3", "vec4", "mat3x3", "mat4x4", "array", "sampler",
    "texture_2d",
];

/// WGSL keywords and reserved words.
const WGSL_RESERVED: &[&str] = &[
    // keywords
    "alias", "break", "case", "const", "const_assert", "continue", "continuing", "default",
    "diagnostic", "discard", "else", "enable", "false", "fn", "for", "if", "let", "loop",
    "override", "requires", "return", "struct", "switch", "true", "var", "while",
    // reserved
    "NULL", "Self", "abstract", "active", "alignas", "alignof", "as", "asm", "asm_fragment",
    "async", "attribute", "auto", "await", "become", "binding_array", "cast", "catch", "class",
    "co_await", "co_return", "co_yield", "coherent", "column_major", "common", "compile",
    "compile_fragment", "concept", "const_cast", "consteval", "constexpr", "constinit", "crate",
    "debugger", "decltype", "delete", "demote", "demote_to_helper", "do", "dynamic_cast", "enum",
    "explicit", "export", "extends", "extern", "external", "fallthrough", "filter", "final",
    "finally", "friend", "from", "fxgroup", "get", "goto", "groupshared", "highp", "impl",
    "implements", "import", "inline", "instanceof", "interface", "layout", "lowp", "macro",
    "macro_rules", "match", "mediump", "meta", "mod", "module", "move", "mut", "mutable",
    "namespace", "new", "nil", "noexcept", "noinline", "nointerpolation", "noperspective", "null",
    "nullptr", "of", "operator", "package", "packoffset", "partition", "pass", "patch",
    "pixelfragment", "precise", "precision", "premerge", "priv", "protected", "pub", "public",
    "readonly", "ref", "regardless", "register", "reinterpret_cast", "require", "resource",
    "restrict", "self", "set", "shared", "sizeof", "smooth", "snorm", "static", "static_assert",
    "static_cast", "std", "subroutine", "super", "target", "template", "this", "thread_local",
    "throw", "trait", "try", "type", "typedef", "typeid", "typename", "typeof", "union", "unless",
    "unorm", "unsafe", "unsized", "use", "using", "varying", "virtual", "volatile", "wgsl",
    "where", "with", "writeonly", "yield",
];

/// Checks that `name` can be spelled in generated shader code: the shape
/// `[A-Za-z_][A-Za-z0-9_]*`, no `__` prefix or lone `_`, and no WGSL
/// keyword, reserved word or name of the generated interface.
#[must_use]
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let well_formed = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    well_formed
        && name != "_"
        && !name.starts_with("__")
        && !WGSL_RESERVED.contains(&name)
        && !INTERFACE_NAMES.contains(&name)
        && !PREDECLARED_TYPES.contains(&name)
}
