//! Topic normalization for sources that only index English text.
//!
//! Chinese research phrases are mapped to their English equivalents with a
//! longest-phrase-first dictionary pass, remaining connective words are
//! stripped, and a topic that collapses to almost nothing falls back to a
//! broad default so the search still returns something useful.

/// Returned when translation strips the topic down to fewer than three
/// characters.
const DEFAULT_TOPIC: &str = "machine learning";

/// Chinese research phrases and their English equivalents. Ordered longest
/// first so compound phrases win over their substrings.
const PHRASE_TABLE: &[(&str, &str)] = &[
    ("卷积神经网络", "convolutional neural network"),
    ("循环神经网络", "recurrent neural network"),
    ("自然语言处理", "natural language processing"),
    ("批量归一化", "batch normalization"),
    ("注意力机制", "attention mechanism"),
    ("优化算法", "optimization algorithm"),
    ("人工智能", "artificial intelligence"),
    ("计算机视觉", "computer vision"),
    ("强化学习", "reinforcement learning"),
    ("深度学习", "deep learning"),
    ("机器学习", "machine learning"),
    ("神经网络", "neural network"),
    ("梯度下降", "gradient descent"),
    ("反向传播", "backpropagation"),
    ("损失函数", "loss function"),
    ("图像识别", "image recognition"),
    ("语音识别", "speech recognition"),
    ("推荐系统", "recommendation system"),
    ("自动驾驶", "autonomous driving"),
    ("最新研究", "recent research"),
    ("正则化", "regularization"),
    ("学习率", "learning rate"),
    ("准确率", "accuracy"),
    ("医疗", "medical"),
    ("诊断", "diagnosis"),
    ("综述", "survey"),
    ("算法", "algorithm"),
    ("模型", "model"),
    ("方法", "method"),
    ("技术", "technique"),
    ("应用", "application"),
    ("性能", "performance"),
    ("效果", "effectiveness"),
];

/// Connective words and filler dropped after phrase translation.
const STOPWORDS: &[&str] = &[
    "的", "在", "中", "与", "和", "或", "关于", "对于", "基于", "通过", "使用", "采用", "研究",
    "分析", "实现", "设计", "开发", "提出", "改进", "优化", "评估", "实验", "结果", "比较",
    "讨论", "总结", "结论", "系统",
];

/// Normalize a research topic for English-only sources.
///
/// Topics without CJK characters pass through untouched.
pub fn normalize_topic(topic: &str) -> String {
    if !topic.chars().any(is_cjk) {
        return topic.to_string();
    }

    tracing::info!(topic, "translating non-English topic");

    let mut translated = topic.to_string();
    for (chinese, english) in PHRASE_TABLE {
        if translated.contains(chinese) {
            // Surrounding spaces keep adjacent replacements from merging
            translated = translated.replace(chinese, &format!(" {} ", english));
        }
    }

    for stopword in STOPWORDS {
        translated = translated.replace(stopword, " ");
    }

    let translated = translated.split_whitespace().collect::<Vec<_>>().join(" ");

    if translated.trim().len() < 3 {
        tracing::warn!(topic, "translation collapsed the topic, using default");
        return DEFAULT_TOPIC.to_string();
    }

    tracing::debug!(topic, %translated, "topic translated");
    translated
}

fn is_cjk(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}
