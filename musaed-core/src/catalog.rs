//! Built-in business catalog.
//!
//! Entry order is match priority. Specific topics come first; gratitude and
//! greetings come last so that "hello, how much per meter?" answers the
//! price question.

use crate::knowledge::KnowledgeEntry;

fn entry(
    topic: &str,
    keywords_primary: &[&str],
    keywords_secondary: &[&str],
    response_primary: &str,
    response_secondary: &str,
) -> KnowledgeEntry {
    KnowledgeEntry {
        topic: topic.to_string(),
        keywords_primary: keywords_primary.iter().map(|k| k.to_string()).collect(),
        keywords_secondary: keywords_secondary.iter().map(|k| k.to_string()).collect(),
        response_primary: response_primary.to_string(),
        response_secondary: response_secondary.to_string(),
        addresses_user: false,
    }
}

pub fn builtin_entries() -> Vec<KnowledgeEntry> {
    vec![
        entry(
            "contact",
            &[
                "تواصل", "أكلم حد", "رقم تليفون", "تليفونكم", "موبايل", "اتصل", "رقمكم", "كلمني",
                "اريد التواصل",
            ],
            &["contact", "call", "phone number", "mobile", "talk to someone", "communicate"],
            "يمكنك التواصل مباشرة مع مدير الموقع عبر الرقم: 01129276218 📞\nأو عبر البريد الإلكتروني: ramadan.mohamed@example.com\nيسعدنا دائماً خدمتك!",
            "You can contact the site manager directly at: 01129276218 📞\nor via email: ramadan.mohamed@example.com\nWe are always happy to help!",
        ),
        entry(
            "assistant",
            &["من انت", "مين انت", "من أنت", "عرفني", "بوت", "روبوت", "مساعد"],
            &["who are you", "who is this", "bot", "robot", "assistant", "help"],
            "أنا المساعد الذكي لمدير الموقع الحاج رمضان محمد جبر. 🤖\nمهمتي مساعدتك في معرفة خدماتنا، تقديم نصائح في الديكور، وتسهيل تواصلك معنا.",
            "I am the Smart Assistant for Haj Ramadan Mohamed Gabr. 🤖\nMy mission is to help you explore our services, give decor tips, and connect you with us.",
        ),
        entry(
            "about",
            &[
                "من نحن", "عن الشركة", "تاريخ", "خبرة", "مين انتم", "من انتم", "من أنتم",
                "مين حضراتكم",
            ],
            &["about us", "who are we", "history", "experience", "site manager info"],
            "نحن فريق 'الحاج رمضان محمد جبر للدهانات والديكورات'، رواد في مجال التشطيبات في مصر بخبرة تمتد لأكثر من 30 عاماً تحت إشراف مدير الموقع. 🏆\nتخصصنا تحويل الوحدات السكنية والتجارية إلى تحف فنية باستخدام أحدث الخامات وتقنيات التنفيذ.",
            "We are 'Haj Ramadan Mohamed Gabr for Paints & Decor', leaders in finishing in Egypt with over 30 years of experience. 🏆\nWe specialize in transforming residential and commercial units into artistic masterpieces using the latest materials and techniques.",
        ),
        entry(
            "services",
            &["خدمات", "بتعملوا ايه", "شغلكم", "انشطة", "مجالات"],
            &["services", "what do you do", "activities", "scope", "work"],
            "خدماتنا تشمل: 🎨\n1. دهانات حديثة وكلاسيكية.\n2. تشطيبات جبس بورد وأسقف معلقة.\n3. تركيب جميع أنواع ورق الحائط.\n4. تجديد وترميم الشقق القديمة.\n5. تشطيب كامل (على المفتاح).",
            "Our services include: 🎨\n1. Modern and Classic Paints.\n2. Gypsum Board and Suspended Ceilings.\n3. Wallpaper Installation.\n4. Renovation of Old Apartments.\n5. Full Turnkey Finishing.",
        ),
        entry(
            "projects",
            &["مشاريع", "أعمال", "صور", "سابقة اعمال", "نفذتوها", "وريني", "مشارعكم"],
            &["projects", "portfolio", "works", "gallery", "previous work", "show me"],
            "فخورون بمشاريعنا! 🏗️\nقمنا بتنفيذ مئات الوحدات السكنية والتجارية في القاهرة الكبرى.\nيمكنك مشاهدة صور حية لأعمالنا في صفحة 'مشاريعنا' على الموقع.\nهل تحب أن أصف لك أحدث مشروع قمنا به؟ 😃",
            "We are proud of our projects! 🏗️\nWe have executed hundreds of residential and commercial units in Greater Cairo.\nYou can view live photos of our work on the 'Projects' page of the website.\nWould you like me to describe our latest project? 😃",
        ),
        entry(
            "location",
            &["مكان", "عنوان", "موقع", "فين", "مقر", "لوكيشن"],
            &["location", "address", "where", "office", "hq"],
            "مقر مدير الموقع الرئيسي في القاهرة، ولكننا نقدم خدماتنا في جميع أنحاء الجمهورية (القاهرة، الجيزة، والإسكندرية والمحافظات الأخرى). 🚛",
            "Our HQ is in Cairo, but we serve all over Egypt (Cairo, Giza, Alexandria, and other governorates). 🚛",
        ),
        entry(
            "hours",
            &["مواعيد", "شغالين", "فاتحين", "وقت"],
            &["hours", "time", "open", "working hours"],
            "متاحون لخدمتكم طوال أيام الأسبوع من الساعة 9 صباحاً حتى 9 مساءً. 🕘",
            "We are available to serve you 7 days a week from 9 AM to 9 PM. 🕘",
        ),
        entry(
            "cracks",
            &["شروخ", "تنمل", "ترييح", "شرخ"],
            &["cracks", "fissures", "wall crack", "splitting"],
            "الشروخ أنواع: 🔸 شروخ سطحية: نعالجها بمعجون شروخ مرن. 🔸 شروخ عميقة (إنشائية): نستخدم شريط 'ميش' مع المعجون لضمان تماسك الطبقات.\nلا تقلق، لدينا حلول نهائية! 🛠️",
            "Cracks have types:\n🔸 Surface cracks: Treated with flexible crack putty.\n🔸 Deep cracks (structural): We use 'Mesh' tape during putty to ensure layer cohesion.\nDon't worry, we have permanent solutions! 🛠️",
        ),
        entry(
            "price",
            &["اسعار", "سعر", "تكلفة", "بكام", "المتر", "مصنعية"],
            &["price", "cost", "how much", "rate", "quotation"],
            "الأسعار تختلف حسب نوع التشطيب والمساحة وحالة الحوائط. 💰\nولكن كن واثقاً أننا نقدم أفضل قيمة مقابل سعر في السوق.\nيمكننا تحديد موعد للمعاينة لتقديم عرض سعر دقيق ومجاني! 📅",
            "Prices vary depending on the finish type, area, and wall condition. 💰\nBut rest assured, we offer the best value for money in the market.\nWe can schedule a visit for a precise and free quotation! 📅",
        ),
        entry(
            "materials",
            &["جوتن", "سايبس", "خامات", "انواع دهان", "بلاستيك", "تستخدموا ايه"],
            &["jotun", "sipes", "materials", "brands", "paint types"],
            "نحن معتمدون لاستخدام كبرى العلامات العالمية مثل 'جوتن' (Jotun) و 'سايبس' (Sipes) و 'جي إل سي' (GLC).\nنضمن لك خامات أصلية تعيش طويلاً وتعطيك ألوان زاهية. 🌈",
            "We are certified users of top global brands like 'Jotun', 'Sipes', and 'GLC'.\nWe guarantee authentic materials that last long and provide vibrant colors. 🌈",
        ),
        entry(
            "gratitude",
            &["شكرا", "متشكر", "تسلم", "الف شكر"],
            &["thank", "thanks", "thx", "appreciate"],
            "العفو، ده واجبنا! 🙏\nلو عندك أي سؤال تاني عن الدهانات أو الديكور أنا موجود.",
            "You're welcome! 🙏\nIf you have any other question about paints or decor, I'm right here.",
        ),
        entry(
            "greeting",
            &[
                "السلام عليكم", "سلام عليكم", "اهلا", "مرحبا", "ازيك", "ازيكم", "صباح الخير",
                "مساء الخير", "هاي", "هلو",
            ],
            &["hello", "hi", "hey", "good morning", "good evening", "greetings"],
            "أهلاً وسهلاً! نورتنا 🌟\nأنا المساعد الذكي لشركة الحاج رمضان محمد جبر للدهانات والديكورات. تقدر تسألني عن خدماتنا أو الأسعار أو مواعيد العمل.",
            "Welcome! 🌟\nI'm the smart assistant for Haj Ramadan Mohamed Gabr Paints & Decor. Ask me about our services, prices or working hours.",
        ),
    ]
}
