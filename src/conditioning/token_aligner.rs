//! 双流 token 对齐
//!
//! SD3 的 CLIP-L / CLIP-G 两个分词器各自独立分块, 长文本下两个流的
//! 块数可能不一致, 而下游编码器要求两个流按块锁步。本模块在编码前用
//! 空串分词产生的填充块把较短的流补齐, 只增不减。
//! t5xxl 流与块数无关, 不参与对齐, 原样透传。

use strum_macros::{Display, EnumString};

/// 空文本的填充策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
pub enum EmptyPadding {
    /// 空文本直接清空对应流
    None,
    /// 空文本按空串正常分词
    EmptyPrompt,
}

/// 单个命名通道的分词输出, 有序的块序列
///
/// 块对对齐器不透明, 对齐器只观察数量并追加填充块
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenStream<E> {
    entries: Vec<E>,
}

impl<E> TokenStream<E> {
    pub fn from_entries(entries: Vec<E>) -> Self {
        Self { entries }
    }

    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[E] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<E> {
        self.entries
    }

    /// 空文本清空
    ///
    /// `EmptyPadding::None` 模式下空文本得到零块流, 其余情况保持分词结果
    pub fn resolve(self, text_was_empty: bool, padding: EmptyPadding) -> Self {
        if text_was_empty && padding == EmptyPadding::None {
            Self::empty()
        } else {
            self
        }
    }

    /// 用填充块补齐到目标块数
    fn extend_to(&mut self, target: usize, filler: &E)
    where
        E: Clone,
    {
        while self.entries.len() < target {
            self.entries.push(filler.clone());
        }
    }
}

/// 一次文本输入的三个命名流
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenBundle<E> {
    pub l: TokenStream<E>,
    pub g: TokenStream<E>,
    pub t5xxl: TokenStream<E>,
}

impl<E> TokenBundle<E> {
    pub fn new(l: TokenStream<E>, g: TokenStream<E>, t5xxl: TokenStream<E>) -> Self {
        Self { l, g, t5xxl }
    }
}

/// 对齐用的填充块
///
/// 两个块必须取自同一次空串分词
#[derive(Debug, Clone)]
pub struct FillerEntries<E> {
    pub l: E,
    pub g: E,
}

/// 对齐 l/g 两个流的块数
///
/// 块数一致时不调用 `filler` 并原样返回; 不一致时恰好调用一次,
/// 把较短的流用对应通道的填充块补到 `max(n_l, n_g)`。
/// 只追加, 不截断, 不改变原有块的顺序。
pub fn align<E, F, Err>(mut bundle: TokenBundle<E>, filler: F) -> Result<TokenBundle<E>, Err>
where
    E: Clone,
    F: FnOnce() -> Result<FillerEntries<E>, Err>,
{
    let (n_l, n_g) = (bundle.l.len(), bundle.g.len());
    if n_l == n_g {
        return Ok(bundle);
    }

    let filler = filler()?;
    let target = n_l.max(n_g);
    bundle.l.extend_to(target, &filler.l);
    bundle.g.extend_to(target, &filler.g);

    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::str::FromStr;

    use super::*;
    use crate::error::Error;

    fn stream(prefix: &str, count: usize) -> TokenStream<String> {
        TokenStream::from_entries((0..count).map(|i| format!("{prefix}{i}")).collect())
    }

    fn filler() -> Result<FillerEntries<String>, Error> {
        Ok(FillerEntries {
            l: "fill_l".to_string(),
            g: "fill_g".to_string(),
        })
    }

    #[test]
    fn test_grows_shorter_l_stream() -> anyhow::Result<()> {
        // l=2, g=5 -> l 补齐到 5, g 不变
        let bundle = TokenBundle::new(stream("l", 2), stream("g", 5), stream("t5", 1));
        let aligned = align(bundle, filler)?;

        assert_eq!(aligned.l.len(), 5);
        assert_eq!(aligned.g.len(), 5);
        assert_eq!(
            aligned.l.entries(),
            ["l0", "l1", "fill_l", "fill_l", "fill_l"]
        );
        assert_eq!(aligned.g.entries(), ["g0", "g1", "g2", "g3", "g4"]);
        Ok(())
    }

    #[test]
    fn test_grows_shorter_g_stream() -> anyhow::Result<()> {
        let bundle = TokenBundle::new(stream("l", 4), stream("g", 1), stream("t5", 0));
        let aligned = align(bundle, filler)?;

        assert_eq!(aligned.l.len(), 4);
        assert_eq!(aligned.g.len(), 4);
        assert_eq!(aligned.g.entries(), ["g0", "fill_g", "fill_g", "fill_g"]);
        Ok(())
    }

    #[test]
    fn test_equal_counts_skip_filler() -> anyhow::Result<()> {
        // 块数一致时不得触发空串分词
        let invoked = Cell::new(false);
        let bundle = TokenBundle::new(stream("l", 3), stream("g", 3), stream("t5", 2));
        let expected = bundle.clone();

        let aligned = align(bundle, || {
            invoked.set(true);
            filler()
        })?;

        assert!(!invoked.get());
        assert_eq!(aligned, expected);
        Ok(())
    }

    #[test]
    fn test_empty_bundle_skips_filler() -> anyhow::Result<()> {
        let invoked = Cell::new(false);
        let bundle: TokenBundle<String> = TokenBundle::default();

        let aligned = align(bundle, || {
            invoked.set(true);
            filler()
        })?;

        assert!(!invoked.get());
        assert!(aligned.l.is_empty());
        assert!(aligned.g.is_empty());
        Ok(())
    }

    #[test]
    fn test_single_filler_episode() -> anyhow::Result<()> {
        // 补 3 个块也只分词一次
        let episodes = Cell::new(0usize);
        let bundle = TokenBundle::new(stream("l", 2), stream("g", 5), stream("t5", 0));

        let aligned = align(bundle, || {
            episodes.set(episodes.get() + 1);
            filler()
        })?;

        assert_eq!(episodes.get(), 1);
        // 所有填充块来自同一结果
        assert!(aligned.l.entries()[2..].iter().all(|e| e == "fill_l"));
        Ok(())
    }

    #[test]
    fn test_no_truncation_preserves_order() -> anyhow::Result<()> {
        let bundle = TokenBundle::new(stream("l", 3), stream("g", 7), stream("t5", 2));
        let aligned = align(bundle, filler)?;

        // 原有块全部保留且顺序不变, 填充块只在尾部
        assert_eq!(&aligned.l.entries()[..3], ["l0", "l1", "l2"]);
        assert_eq!(aligned.g.entries(), stream("g", 7).entries());
        Ok(())
    }

    #[test]
    fn test_t5xxl_passes_through() -> anyhow::Result<()> {
        let bundle = TokenBundle::new(stream("l", 1), stream("g", 6), stream("t5", 9));
        let aligned = align(bundle, filler)?;

        assert_eq!(aligned.t5xxl, stream("t5", 9));
        Ok(())
    }

    #[test]
    fn test_resolve_none_mode_empties_stream() {
        let resolved = stream("l", 2).resolve(true, EmptyPadding::None);
        assert!(resolved.is_empty());
    }

    #[test]
    fn test_resolve_empty_prompt_keeps_stream() {
        let resolved = stream("l", 2).resolve(true, EmptyPadding::EmptyPrompt);
        assert_eq!(resolved.len(), 2);

        // 非空文本不受模式影响
        let resolved = stream("g", 3).resolve(false, EmptyPadding::None);
        assert_eq!(resolved.len(), 3);
    }

    #[test]
    fn test_nulled_stream_padded_to_one() -> anyhow::Result<()> {
        // 空文本 l + none 模式, g 有 1 块 -> l 补 1 个填充块
        let l = stream("l", 1).resolve(true, EmptyPadding::None);
        let bundle = TokenBundle::new(l, stream("g", 1), stream("t5", 1));
        let aligned = align(bundle, filler)?;

        assert_eq!(aligned.l.entries(), ["fill_l"]);
        assert_eq!(aligned.g.len(), 1);
        Ok(())
    }

    #[test]
    fn test_filler_error_propagates() {
        let bundle = TokenBundle::new(stream("l", 0), stream("g", 2), stream("t5", 0));
        let result = align(bundle, || {
            Err::<FillerEntries<String>, Error>(Error::EmptyFiller("l".to_string()))
        });

        assert!(matches!(result, Err(Error::EmptyFiller(_))));
    }

    #[test]
    fn test_empty_padding_from_widget_string() -> anyhow::Result<()> {
        assert_eq!(EmptyPadding::from_str("none")?, EmptyPadding::None);
        assert_eq!(
            EmptyPadding::from_str("empty_prompt")?,
            EmptyPadding::EmptyPrompt
        );
        assert!(EmptyPadding::from_str("unknown").is_err());
        Ok(())
    }
}
