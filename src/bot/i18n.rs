//! Localised bot texts (English, Russian, Uzbek).
//!
//! Texts are Telegram HTML. Placeholders look like `{source}` and are
//! substituted with [`fill`]; values are inserted verbatim, so callers escape
//! anything user-provided.

/// Supported interface languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lang {
    En,
    Ru,
    Uz,
}

impl Lang {
    pub const ALL: [Lang; 3] = [Lang::Uz, Lang::En, Lang::Ru];

    pub fn code(self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::Ru => "ru",
            Lang::Uz => "uz",
        }
    }

    pub fn from_code(code: &str) -> Option<Lang> {
        let primary = code.split(['-', '_']).next().unwrap_or("").to_ascii_lowercase();
        match primary.as_str() {
            "en" => Some(Lang::En),
            "ru" => Some(Lang::Ru),
            "uz" => Some(Lang::Uz),
            _ => None,
        }
    }

    /// Language for a Telegram `language_code`, English if unknown.
    pub fn detect(code: Option<&str>) -> Lang {
        code.and_then(Lang::from_code).unwrap_or(Lang::En)
    }

    /// Button label in the language's own name.
    pub fn native_name(self) -> &'static str {
        match self {
            Lang::En => "🇬🇧 English",
            Lang::Ru => "🇷🇺 Русский",
            Lang::Uz => "🇺🇿 O'zbekcha",
        }
    }

    pub fn texts(self) -> &'static Texts {
        match self {
            Lang::En => &EN,
            Lang::Ru => &RU,
            Lang::Uz => &UZ,
        }
    }
}

/// Replace `{key}` placeholders with values.
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let value = tail
            .find('}')
            .and_then(|close| values.iter().find(|(key, _)| *key == &tail[1..close]).map(|(_, v)| (close, v)));
        match value {
            Some((close, value)) => {
                out.push_str(value);
                rest = &tail[close + 1..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

pub struct Texts {
    pub welcome: &'static str,
    pub documents: &'static str,
    pub images: &'static str,
    pub audio: &'static str,
    pub video: &'static str,
    pub send_direct: &'static str,
    pub back_menu: &'static str,
    pub back: &'static str,
    pub language: &'static str,
    pub document_conversion: &'static str,
    pub image_conversion: &'static str,
    pub audio_conversion: &'static str,
    pub video_conversion: &'static str,
    pub direct_upload: &'static str,
    pub choose_target: &'static str,
    pub convert_to: &'static str,
    pub ready_convert: &'static str,
    pub file_received: &'static str,
    pub photo_received: &'static str,
    pub audio_received: &'static str,
    pub video_received: &'static str,
    pub converting: &'static str,
    pub conversion_completed: &'static str,
    pub success_caption: &'static str,
    pub conversion_failed: &'static str,
    pub unsupported_pair: &'static str,
    pub no_audio_track: &'static str,
    pub timed_out: &'static str,
    pub too_large: &'static str,
    pub busy: &'static str,
    pub invalid_request: &'static str,
    pub pending_missing: &'static str,
    pub start_over: &'static str,
    pub unsupported_format: &'static str,
    pub file_type_error: &'static str,
    pub error_occurred: &'static str,
    pub access_denied: &'static str,
    pub help: &'static str,
    pub select_language: &'static str,
    pub language_set: &'static str,
}

static EN: Texts = Texts {
    welcome: "🤖 <b>File Converter Bot</b>\n\nWelcome! I can help you convert files between different formats.\n\n<b>Choose an option:</b>",
    documents: "📄 Documents",
    images: "🖼️ Images",
    audio: "🎵 Audio",
    video: "🎬 Video",
    send_direct: "📤 Send File Directly",
    back_menu: "🔙 Back to Menu",
    back: "🔙 Back",
    language: "🌐 Language",
    document_conversion: "📄 <b>Document Conversion</b>\n\nChoose the format you want to convert:",
    image_conversion: "🖼️ <b>Image Conversion</b>\n\nChoose the format you want to convert:",
    audio_conversion: "🎵 <b>Audio Conversion</b>\n\nChoose the format you want to convert:",
    video_conversion: "🎬 <b>Video Conversion</b>\n\nChoose the format you want to convert:",
    direct_upload: "📤 <b>Direct File Upload</b>\n\nSimply send me any supported file and I'll show you conversion options:\n\n<b>Supported formats:</b>\n📄 PDF, DOCX, TXT\n🖼️ JPG, PNG, WEBP\n🎵 MP3, WAV, OGG\n🎬 MP4",
    choose_target: "📎 <b>{source} Conversion</b>\n\nChoose target format:",
    convert_to: "Convert to {target}",
    ready_convert: "📎 <b>Ready to Convert</b>\n\n<b>From:</b> {source}\n<b>To:</b> {target}\n\nPlease send your {source} file now and I'll convert it to {target}.",
    file_received: "📁 <b>File received:</b> {name}\n📊 <b>Size:</b> {size} KB\n🔧 <b>Type:</b> {type}\n\nChoose conversion format:",
    photo_received: "📷 <b>Photo received!</b>\n📊 <b>Size:</b> {size} KB\n\nChoose conversion format:",
    audio_received: "🎵 <b>Audio file received!</b>\n📊 <b>Size:</b> {size} KB\n\nChoose conversion format:",
    video_received: "🎬 <b>Video file received!</b>\n📊 <b>Size:</b> {size} KB\n\nChoose conversion format:",
    converting: "🔄 Converting from {source} to {target}...\nPlease wait, this may take a moment.",
    conversion_completed: "✅ <b>Conversion completed!</b>\n📁 {source} → {target}\n📤 File sent above.",
    success_caption: "✅ Successfully converted to {target}!",
    conversion_failed: "❌ Conversion failed. Please ensure your file is valid and try again.",
    unsupported_pair: "❌ {source} → {target} is not supported.\n\nAvailable for {source}: {targets}",
    no_audio_track: "❌ This video has no audio track, so there is nothing to convert to MP3.",
    timed_out: "⏱️ Conversion took too long and was cancelled. Please try a smaller file.",
    too_large: "❌ This file is too large ({size} MB). The limit is {limit} MB.",
    busy: "⏳ Please wait, your previous file is still being converted.",
    invalid_request: "❌ Invalid conversion request.",
    pending_missing: "❌ File not found. Please send the file again.",
    start_over: "❌ Please start over. Send /start to begin.",
    unsupported_format: "❌ Sorry, I don't support conversion for {ext} files yet.\n\nSupported formats: PDF, DOCX, TXT, JPG, PNG, WEBP, MP3, WAV, OGG, MP4",
    file_type_error: "❌ Cannot determine file type. Please ensure your file has an extension.",
    error_occurred: "❌ An error occurred. Please try again.",
    access_denied: "Access denied.",
    help: "<b>How to use:</b>\n\n<b>Method 1: Menu System (Recommended)</b>\n1. Use /start to open the main menu\n2. Choose your file type (Documents, Images, Audio, Video)\n3. Select the source format you want to convert from\n4. Choose the target format you want to convert to\n5. Send your file and get the converted result!\n\n<b>Method 2: Direct Upload</b>\n1. Send any supported file directly\n2. Choose conversion format from the buttons\n3. Download your converted file!\n\n<b>Supported formats:</b>\n📄 Documents: PDF, DOCX, TXT\n🖼️ Images: JPG, PNG, WEBP\n🎵 Audio: MP3, WAV, OGG\n🎬 Video: MP4 → MP3\n\n<b>Tips:</b>\n• Menu system provides step-by-step guidance\n• Files are automatically deleted after conversion\n• Conversion may take a few moments for large files\n• Use /language command to change language",
    select_language: "🌐 <b>Select Language / Tilni tanlang / Выберите язык:</b>",
    language_set: "✅ Language set to English.",
};

static RU: Texts = Texts {
    welcome: "🤖 <b>Бот Конвертера Файлов</b>\n\nДобро пожаловать! Я могу помочь конвертировать файлы между различными форматами.\n\n<b>Выберите опцию:</b>",
    documents: "📄 Документы",
    images: "🖼️ Изображения",
    audio: "🎵 Аудио",
    video: "🎬 Видео",
    send_direct: "📤 Отправить файл напрямую",
    back_menu: "🔙 Вернуться в меню",
    back: "🔙 Назад",
    language: "🌐 Язык",
    document_conversion: "📄 <b>Конвертация Документов</b>\n\nВыберите формат для конвертации:",
    image_conversion: "🖼️ <b>Конвертация Изображений</b>\n\nВыберите формат для конвертации:",
    audio_conversion: "🎵 <b>Конвертация Аудио</b>\n\nВыберите формат для конвертации:",
    video_conversion: "🎬 <b>Конвертация Видео</b>\n\nВыберите формат для конвертации:",
    direct_upload: "📤 <b>Прямая Загрузка Файла</b>\n\nПросто отправьте любой поддерживаемый файл, и я покажу варианты конвертации:\n\n<b>Поддерживаемые форматы:</b>\n📄 PDF, DOCX, TXT\n🖼️ JPG, PNG, WEBP\n🎵 MP3, WAV, OGG\n🎬 MP4",
    choose_target: "📎 <b>Конвертация {source}</b>\n\nВыберите целевой формат:",
    convert_to: "Конвертировать в {target}",
    ready_convert: "📎 <b>Готов к Конвертации</b>\n\n<b>Из:</b> {source}\n<b>В:</b> {target}\n\nПожалуйста, отправьте ваш файл {source} сейчас, и я конвертирую его в {target}.",
    file_received: "📁 <b>Файл получен:</b> {name}\n📊 <b>Размер:</b> {size} КБ\n🔧 <b>Тип:</b> {type}\n\nВыберите формат конвертации:",
    photo_received: "📷 <b>Фото получено!</b>\n📊 <b>Размер:</b> {size} КБ\n\nВыберите формат конвертации:",
    audio_received: "🎵 <b>Аудио файл получен!</b>\n📊 <b>Размер:</b> {size} КБ\n\nВыберите формат конвертации:",
    video_received: "🎬 <b>Видео файл получен!</b>\n📊 <b>Размер:</b> {size} КБ\n\nВыберите формат конвертации:",
    converting: "🔄 Конвертация из {source} в {target}...\nПожалуйста подождите, это может занять некоторое время.",
    conversion_completed: "✅ <b>Конвертация завершена!</b>\n📁 {source} → {target}\n📤 Файл отправлен выше.",
    success_caption: "✅ Успешно конвертировано в {target}!",
    conversion_failed: "❌ Конвертация не удалась. Убедитесь, что файл не повреждён, и попробуйте снова.",
    unsupported_pair: "❌ {source} → {target} не поддерживается.\n\nДоступно для {source}: {targets}",
    no_audio_track: "❌ В этом видео нет звуковой дорожки, конвертировать в MP3 нечего.",
    timed_out: "⏱️ Конвертация заняла слишком много времени и была отменена. Попробуйте файл поменьше.",
    too_large: "❌ Файл слишком большой ({size} МБ). Ограничение: {limit} МБ.",
    busy: "⏳ Пожалуйста, подождите, предыдущий файл ещё конвертируется.",
    invalid_request: "❌ Неверный запрос конвертации.",
    pending_missing: "❌ Файл не найден. Пожалуйста, отправьте файл снова.",
    start_over: "❌ Пожалуйста, начните сначала. Отправьте /start для начала.",
    unsupported_format: "❌ Извините, я не поддерживаю конвертацию файлов {ext}.\n\nПоддерживаемые форматы: PDF, DOCX, TXT, JPG, PNG, WEBP, MP3, WAV, OGG, MP4",
    file_type_error: "❌ Не удается определить тип файла. Убедитесь, что у файла есть расширение.",
    error_occurred: "❌ Произошла ошибка. Пожалуйста, попробуйте снова.",
    access_denied: "Доступ запрещён.",
    help: "<b>Как использовать:</b>\n\n<b>Метод 1: Система Меню (Рекомендуется)</b>\n1. Используйте /start для открытия главного меню\n2. Выберите тип файла (Документы, Изображения, Аудио, Видео)\n3. Выберите исходный формат для конвертации\n4. Выберите целевой формат\n5. Отправьте файл и получите результат!\n\n<b>Метод 2: Прямая Загрузка</b>\n1. Отправьте любой поддерживаемый файл напрямую\n2. Выберите формат конвертации из кнопок\n3. Скачайте конвертированный файл!\n\n<b>Поддерживаемые форматы:</b>\n📄 Документы: PDF, DOCX, TXT\n🖼️ Изображения: JPG, PNG, WEBP\n🎵 Аудио: MP3, WAV, OGG\n🎬 Видео: MP4 → MP3\n\n<b>Советы:</b>\n• Система меню предоставляет пошаговое руководство\n• Файлы автоматически удаляются после конвертации\n• Конвертация может занять некоторое время для больших файлов\n• Используйте команду /language для смены языка",
    select_language: "🌐 <b>Выберите язык / Select Language / Tilni tanlang:</b>",
    language_set: "✅ Язык изменён на русский.",
};

static UZ: Texts = Texts {
    welcome: "🤖 <b>Fayl Konverter Bot</b>\n\nXush kelibsiz! Men fayllarni turli formatlar orasida konvertatsiya qilishda yordam beraman.\n\n<b>Variantni tanlang:</b>",
    documents: "📄 Hujjatlar",
    images: "🖼️ Rasmlar",
    audio: "🎵 Audio",
    video: "🎬 Video",
    send_direct: "📤 To'g'ridan-to'g'ri fayl yuborish",
    back_menu: "🔙 Menyuga qaytish",
    back: "🔙 Orqaga",
    language: "🌐 Til",
    document_conversion: "📄 <b>Hujjat Konvertatsiyasi</b>\n\nKonvertatsiya qilmoqchi bo'lgan formatni tanlang:",
    image_conversion: "🖼️ <b>Rasm Konvertatsiyasi</b>\n\nKonvertatsiya qilmoqchi bo'lgan formatni tanlang:",
    audio_conversion: "🎵 <b>Audio Konvertatsiyasi</b>\n\nKonvertatsiya qilmoqchi bo'lgan formatni tanlang:",
    video_conversion: "🎬 <b>Video Konvertatsiyasi</b>\n\nKonvertatsiya qilmoqchi bo'lgan formatni tanlang:",
    direct_upload: "📤 <b>To'g'ridan-to'g'ri Fayl Yuklash</b>\n\nQo'llab-quvvatlanadigan faylni yuboring va konvertatsiya variantlarini ko'rsataman:\n\n<b>Qo'llab-quvvatlanadigan formatlar:</b>\n📄 PDF, DOCX, TXT\n🖼️ JPG, PNG, WEBP\n🎵 MP3, WAV, OGG\n🎬 MP4",
    choose_target: "📎 <b>{source} Konvertatsiyasi</b>\n\nNishon formatni tanlang:",
    convert_to: "{target} ga o'tkazish",
    ready_convert: "📎 <b>Konvertatsiyaga tayyor</b>\n\n<b>Dan:</b> {source}\n<b>Ga:</b> {target}\n\nEndi {source} faylingizni yuboring va men uni {target}ga konvertatsiya qilaman.",
    file_received: "📁 <b>Fayl qabul qilindi:</b> {name}\n📊 <b>Hajmi:</b> {size} KB\n🔧 <b>Turi:</b> {type}\n\nKonvertatsiya formatini tanlang:",
    photo_received: "📷 <b>Rasm qabul qilindi!</b>\n📊 <b>Hajmi:</b> {size} KB\n\nKonvertatsiya formatini tanlang:",
    audio_received: "🎵 <b>Audio fayl qabul qilindi!</b>\n📊 <b>Hajmi:</b> {size} KB\n\nKonvertatsiya formatini tanlang:",
    video_received: "🎬 <b>Video fayl qabul qilindi!</b>\n📊 <b>Hajmi:</b> {size} KB\n\nKonvertatsiya formatini tanlang:",
    converting: "🔄 {source}dan {target}ga konvertatsiya qilinmoqda...\nIltimos kuting, bu biroz vaqt olishi mumkin.",
    conversion_completed: "✅ <b>Konvertatsiya yakunlandi!</b>\n📁 {source} → {target}\n📤 Fayl yuqorida yuborildi.",
    success_caption: "✅ {target} formatiga muvaffaqiyatli o'tkazildi!",
    conversion_failed: "❌ Konvertatsiya muvaffaqiyatsiz tugadi. Fayl to'g'riligini tekshirib, qayta urinib ko'ring.",
    unsupported_pair: "❌ {source} → {target} qo'llab-quvvatlanmaydi.\n\n{source} uchun mavjud: {targets}",
    no_audio_track: "❌ Bu videoda audio yo'lak yo'q, MP3 ga o'tkazadigan narsa yo'q.",
    timed_out: "⏱️ Konvertatsiya juda uzoq davom etdi va bekor qilindi. Kichikroq fayl bilan urinib ko'ring.",
    too_large: "❌ Fayl juda katta ({size} MB). Cheklov: {limit} MB.",
    busy: "⏳ Iltimos kuting, oldingi faylingiz hali konvertatsiya qilinmoqda.",
    invalid_request: "❌ Noto'g'ri konvertatsiya so'rovi.",
    pending_missing: "❌ Fayl topilmadi. Faylni qayta yuboring.",
    start_over: "❌ Iltimos qaytadan boshlang. Boshlash uchun /start buyrug'ini yuboring.",
    unsupported_format: "❌ Kechirasiz, men {ext} fayllar uchun konvertatsiyani qo'llab-quvvatlamayman.\n\nQo'llab-quvvatlanadigan formatlar: PDF, DOCX, TXT, JPG, PNG, WEBP, MP3, WAV, OGG, MP4",
    file_type_error: "❌ Fayl turini aniqlab bo'lmadi. Faylingizda kengaytma borligiga ishonch hosil qiling.",
    error_occurred: "❌ Xatolik yuz berdi. Iltimos qayta urinib ko'ring.",
    access_denied: "Kirish taqiqlangan.",
    help: "<b>Qanday foydalanish:</b>\n\n<b>1-usul: Menyu tizimi (Tavsiya etiladi)</b>\n1. Asosiy menyuni ochish uchun /start buyrug'ini ishlating\n2. Fayl turingizni tanlang (Hujjatlar, Rasmlar, Audio, Video)\n3. Konvertatsiya qilmoqchi bo'lgan manba formatni tanlang\n4. Nishon formatni tanlang\n5. Faylingizni yuboring va natijani oling!\n\n<b>2-usul: To'g'ridan-to'g'ri yuklash</b>\n1. Qo'llab-quvvatlanadigan faylni to'g'ridan-to'g'ri yuboring\n2. Tugmalardan konvertatsiya formatini tanlang\n3. Konvertatsiya qilingan faylni yuklab oling!\n\n<b>Qo'llab-quvvatlanadigan formatlar:</b>\n📄 Hujjatlar: PDF, DOCX, TXT\n🖼️ Rasmlar: JPG, PNG, WEBP\n🎵 Audio: MP3, WAV, OGG\n🎬 Video: MP4 → MP3\n\n<b>Maslahatlar:</b>\n• Menyu tizimi qadam-ba-qadam yo'l-yo'riq beradi\n• Fayllar konvertatsiyadan keyin avtomatik o'chiriladi\n• Konvertatsiya katta fayllar uchun biroz vaqt olishi mumkin\n• Tilni o'zgartirish uchun /language buyrug'ini ishlating",
    select_language: "🌐 <b>Tilni tanlang / Select Language / Выберите язык:</b>",
    language_set: "✅ Til o'zbekchaga o'zgartirildi.",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_language() {
        assert_eq!(Lang::detect(Some("ru")), Lang::Ru);
        assert_eq!(Lang::detect(Some("en-US")), Lang::En);
        assert_eq!(Lang::detect(Some("uz_Latn")), Lang::Uz);
        assert_eq!(Lang::detect(Some("de")), Lang::En);
        assert_eq!(Lang::detect(None), Lang::En);
    }

    #[test]
    fn test_code_round_trip() {
        for lang in Lang::ALL {
            assert_eq!(Lang::from_code(lang.code()), Some(lang));
        }
    }

    #[test]
    fn test_fill() {
        let text = fill("{source} → {target} ({source})", &[("source", "PDF"), ("target", "DOCX")]);
        assert_eq!(text, "PDF → DOCX (PDF)");
        assert_eq!(fill("no placeholders", &[("x", "y")]), "no placeholders");
    }

    #[test]
    fn test_fill_does_not_expand_values() {
        let text = fill("{name} is {type}", &[("name", "{type}.pdf"), ("type", "PDF")]);
        assert_eq!(text, "{type}.pdf is PDF");
    }

    #[test]
    fn test_fill_keeps_unknown_braces() {
        assert_eq!(fill("{x} {{target}} {", &[("target", "MP3")]), "{x} {MP3} {");
        assert_eq!(fill("a}b{", &[]), "a}b{");
    }

    #[test]
    fn test_placeholders_present_in_every_language() {
        for lang in Lang::ALL {
            let t = lang.texts();
            assert!(t.converting.contains("{source}") && t.converting.contains("{target}"));
            assert!(t.unsupported_pair.contains("{targets}"));
            assert!(t.too_large.contains("{limit}"));
            assert!(t.file_received.contains("{name}"));
            assert!(t.convert_to.contains("{target}"));
        }
    }
}
